//! Static, read-only resources served over `resources/list` and
//! `resources/read`.

use rmcp::model::{AnnotateAble, RawResource, Resource, ResourceContents};

const MARKDOWN: &str = "text/markdown";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("Resource not found: {0}")]
    NotFound(String),
}

#[derive(Debug)]
struct StaticResource {
    uri: &'static str,
    name: &'static str,
    description: &'static str,
    text: &'static str,
}

const RESOURCES: &[StaticResource] = &[
    StaticResource {
        uri: "hyperbrowser://welcome",
        name: "Welcome",
        description: "Getting started with the Hyperbrowser MCP server",
        text: include_str!("docs/welcome.md"),
    },
    StaticResource {
        uri: "hyperbrowser://tools",
        name: "Tools",
        description: "Catalogue of the available tools and their output formats",
        text: include_str!("docs/tools.md"),
    },
    StaticResource {
        uri: "hyperbrowser://session-options",
        name: "Session options",
        description: "Browser session settings accepted by every browser-backed tool",
        text: include_str!("docs/session-options.md"),
    },
];

/// Registry of the documents compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceRegistry;

impl ResourceRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn list(&self) -> Vec<Resource> {
        RESOURCES
            .iter()
            .map(|r| {
                let mut resource = RawResource::new(r.uri, r.name);
                resource.description = Some(r.description.to_string());
                resource.mime_type = Some(MARKDOWN.to_string());
                resource.no_annotation()
            })
            .collect()
    }

    pub fn read(&self, uri: &str) -> Result<ResourceContents, ResourceError> {
        RESOURCES
            .iter()
            .find(|r| r.uri == uri)
            .map(|r| text_resource(r.uri, r.text, Some(MARKDOWN)))
            .ok_or_else(|| ResourceError::NotFound(uri.to_string()))
    }
}

/// Text resource contents with an explicit media type (or none)
pub(crate) fn text_resource(uri: &str, text: &str, media_type: Option<&str>) -> ResourceContents {
    let mut contents = ResourceContents::text(text, uri);
    if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
        *mime_type = media_type.map(str::to_string);
    }
    contents
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_listed_resource_is_readable() {
        let registry = ResourceRegistry::new();
        let listed = registry.list();
        assert_eq!(listed.len(), 3);

        for info in listed {
            assert_eq!(info.raw.mime_type.as_deref(), Some(MARKDOWN));
            let ResourceContents::TextResourceContents { uri, text, .. } =
                registry.read(&info.raw.uri).unwrap()
            else {
                panic!("{} is not a text resource", info.raw.uri);
            };
            assert_eq!(uri, info.raw.uri);
            assert!(text.starts_with('#'));
        }
    }

    #[test]
    fn test_read_wire_shape() {
        let contents = ResourceRegistry::new().read("hyperbrowser://welcome").unwrap();
        let value = serde_json::to_value(&contents).unwrap();
        assert_eq!(value["uri"], "hyperbrowser://welcome");
        assert_eq!(value["mimeType"], "text/markdown");

        let link = serde_json::to_value(text_resource("https://a.test", "https://a.test", None)).unwrap();
        assert_eq!(link, json!({ "uri": "https://a.test", "text": "https://a.test" }));
    }

    #[test]
    fn test_unknown_uri() {
        assert_eq!(
            ResourceRegistry::new().read("hyperbrowser://nope").unwrap_err(),
            ResourceError::NotFound("hyperbrowser://nope".to_string())
        );
    }
}
