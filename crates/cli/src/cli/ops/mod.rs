pub mod check;
pub mod decode;
pub mod encode;
pub mod fetch;
pub mod gateways;
pub mod init;
pub mod resolve;
pub mod version;

pub use check::Check;
pub use decode::Decode;
pub use encode::Encode;
pub use fetch::Fetch;
pub use gateways::Gateways;
pub use init::Init;
pub use resolve::Resolve;
pub use version::Version;
