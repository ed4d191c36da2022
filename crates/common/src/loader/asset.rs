use bytes::Bytes;
use serde::Deserialize;

use super::LoadError;
use crate::gateway::MediaKind;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_HEADER_LEN: usize = 12;
const GLB_CHUNK_HEADER_LEN: usize = 8;
const GLB_CHUNK_JSON: u32 = 0x4E4F_534A;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelContainer {
    /// Binary `.glb`
    Binary,
    /// Plain `.gltf` JSON
    Json,
}

/// Summary of a parsed glTF 2.0 document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneGraph {
    pub container: ModelContainer,
    pub version: String,
    pub generator: Option<String>,
    pub default_scene: Option<usize>,
    pub scenes: usize,
    pub nodes: usize,
    pub meshes: usize,
    pub materials: usize,
    pub animations: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetContent {
    Image {
        format: String,
        width: u32,
        height: u32,
    },
    Model(SceneGraph),
}

/// Content that loaded and decoded successfully.
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    pub url: String,
    pub kind: MediaKind,
    pub bytes: Bytes,
    pub content: AssetContent,
}

impl LoadedAsset {
    /// Decode `bytes` as `kind`. Gateways that answer with an error page
    ///  instead of the content end up here as [`LoadError::Malformed`].
    pub fn decode(url: &str, kind: MediaKind, bytes: Bytes) -> Result<Self, LoadError> {
        let content = match kind {
            MediaKind::Image => decode_image(&bytes),
            MediaKind::Model => parse_model(&bytes).map(AssetContent::Model),
        }
        .map_err(|reason| LoadError::malformed(kind, reason))?;

        Ok(Self {
            url: url.to_string(),
            kind,
            bytes,
            content,
        })
    }

    pub fn scene(&self) -> Option<&SceneGraph> {
        match &self.content {
            AssetContent::Model(scene) => Some(scene),
            AssetContent::Image { .. } => None,
        }
    }
}

fn decode_image(bytes: &[u8]) -> Result<AssetContent, String> {
    if bytes.is_empty() {
        return Err("empty body".to_string());
    }

    if looks_like_svg(bytes) {
        return Ok(AssetContent::Image {
            format: "svg".to_string(),
            width: 0,
            height: 0,
        });
    }

    let format = image::guess_format(bytes).map_err(|e| e.to_string())?;
    let decoded = image::load_from_memory_with_format(bytes, format).map_err(|e| e.to_string())?;

    Ok(AssetContent::Image {
        format: format
            .extensions_str()
            .first()
            .copied()
            .unwrap_or("unknown")
            .to_string(),
        width: decoded.width(),
        height: decoded.height(),
    })
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let head = String::from_utf8_lossy(head);
    let trimmed = head.trim_start();
    trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && head.contains("<svg"))
}

#[derive(Deserialize)]
struct GltfDocument {
    asset: GltfAsset,
    #[serde(default)]
    scene: Option<usize>,
    #[serde(default)]
    scenes: Vec<serde_json::Value>,
    #[serde(default)]
    nodes: Vec<serde_json::Value>,
    #[serde(default)]
    meshes: Vec<serde_json::Value>,
    #[serde(default)]
    materials: Vec<serde_json::Value>,
    #[serde(default)]
    animations: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct GltfAsset {
    version: String,
    #[serde(default)]
    generator: Option<String>,
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let chunk: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(chunk))
}

/// Parse a GLB container or glTF JSON document.
pub fn parse_model(bytes: &[u8]) -> Result<SceneGraph, String> {
    if bytes.starts_with(GLB_MAGIC) {
        let json = glb_json_chunk(bytes)?;
        return scene_graph(json, ModelContainer::Binary);
    }

    let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
    if first == Some(&b'{') {
        return scene_graph(bytes, ModelContainer::Json);
    }

    Err("not a glTF asset".to_string())
}

fn glb_json_chunk(bytes: &[u8]) -> Result<&[u8], String> {
    let version = read_u32(bytes, 4).ok_or("truncated GLB header")?;
    if version != 2 {
        return Err(format!("unsupported GLB version {}", version));
    }

    let declared = read_u32(bytes, 8).ok_or("truncated GLB header")? as usize;
    if declared > bytes.len() {
        return Err(format!(
            "GLB declares {} bytes but only {} were received",
            declared,
            bytes.len()
        ));
    }

    let chunk_len = read_u32(bytes, GLB_HEADER_LEN).ok_or("missing GLB JSON chunk")? as usize;
    let chunk_type = read_u32(bytes, GLB_HEADER_LEN + 4).ok_or("missing GLB JSON chunk")?;
    if chunk_type != GLB_CHUNK_JSON {
        return Err("first GLB chunk is not JSON".to_string());
    }

    let start = GLB_HEADER_LEN + GLB_CHUNK_HEADER_LEN;
    bytes
        .get(start..start + chunk_len)
        .ok_or_else(|| "GLB JSON chunk exceeds body".to_string())
}

fn scene_graph(json: &[u8], container: ModelContainer) -> Result<SceneGraph, String> {
    let document: GltfDocument = serde_json::from_slice(json).map_err(|e| e.to_string())?;
    if !document.asset.version.starts_with('2') {
        return Err(format!(
            "unsupported glTF version {}",
            document.asset.version
        ));
    }

    Ok(SceneGraph {
        container,
        version: document.asset.version,
        generator: document.asset.generator,
        default_scene: document.scene,
        scenes: document.scenes.len(),
        nodes: document.nodes.len(),
        meshes: document.meshes.len(),
        materials: document.materials.len(),
        animations: document.animations.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const GLTF: &str = r#"{"asset":{"version":"2.0","generator":"ballot-test"},"scene":0,"scenes":[{"nodes":[0]}],"nodes":[{"mesh":0}],"meshes":[{"primitives":[]}]}"#;

    fn glb(json: &str) -> Vec<u8> {
        let mut chunk = json.as_bytes().to_vec();
        while chunk.len() % 4 != 0 {
            chunk.push(b' ');
        }
        let total = GLB_HEADER_LEN + GLB_CHUNK_HEADER_LEN + chunk.len();

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(GLB_MAGIC);
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(&GLB_CHUNK_JSON.to_le_bytes());
        out.extend_from_slice(&chunk);
        out
    }

    #[test]
    fn test_parse_gltf_json() {
        let scene = parse_model(GLTF.as_bytes()).unwrap();
        assert_eq!(scene.container, ModelContainer::Json);
        assert_eq!(scene.version, "2.0");
        assert_eq!(scene.generator.as_deref(), Some("ballot-test"));
        assert_eq!(scene.default_scene, Some(0));
        assert_eq!((scene.scenes, scene.nodes, scene.meshes), (1, 1, 1));
    }

    #[test]
    fn test_parse_glb_container() {
        let scene = parse_model(&glb(GLTF)).unwrap();
        assert_eq!(scene.container, ModelContainer::Binary);
        assert_eq!(scene.nodes, 1);
    }

    #[test]
    fn test_truncated_glb_is_rejected() {
        let mut bytes = glb(GLTF);
        bytes.truncate(bytes.len() - 8);
        assert!(parse_model(&bytes).unwrap_err().contains("declares"));
    }

    #[test]
    fn test_html_error_page_is_malformed() {
        let page = Bytes::from_static(b"<!DOCTYPE html><html>504 Gateway Time-out</html>");
        let err = LoadedAsset::decode("https://gw/ipfs/QmA.glb", MediaKind::Model, page.clone())
            .unwrap_err();
        assert!(matches!(err, LoadError::Malformed { kind: MediaKind::Model, .. }));

        let err = LoadedAsset::decode("https://gw/ipfs/QmA", MediaKind::Image, page).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { kind: MediaKind::Image, .. }));
    }

    #[test]
    fn test_decode_png_dimensions() {
        let mut png = Vec::new();
        image::RgbaImage::new(3, 2)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let asset =
            LoadedAsset::decode("https://gw/ipfs/QmA", MediaKind::Image, Bytes::from(png)).unwrap();
        assert_eq!(
            asset.content,
            AssetContent::Image {
                format: "png".to_string(),
                width: 3,
                height: 2
            }
        );
        assert!(asset.scene().is_none());
    }

    #[test]
    fn test_decode_svg_image() {
        let svg = Bytes::from_static(b"<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>");
        let asset = LoadedAsset::decode("ipfs://QmA", MediaKind::Image, svg).unwrap();
        assert!(matches!(asset.content, AssetContent::Image { ref format, .. } if format == "svg"));
    }
}
