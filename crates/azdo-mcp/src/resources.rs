//! Static reference documents served over `resources/list` and `resources/read`.

use crate::protocol::{ResourceContents, ResourceDefinition};

const MARKDOWN: &str = "text/markdown";

struct StaticResource {
    uri: &'static str,
    name: &'static str,
    description: &'static str,
    text: &'static str,
}

const RESOURCES: [StaticResource; 5] = [
    StaticResource {
        uri: "ado://standard/gold",
        name: "Gold Standard Work Item",
        description: "Five-section task description structure based on Work Item 89",
        text: include_str!("../resources/gold-standard.md"),
    },
    StaticResource {
        uri: "ado://standard/template",
        name: "Description Template",
        description: "Fill-in template for task descriptions and the ||| delimiter",
        text: include_str!("../resources/description-template.md"),
    },
    StaticResource {
        uri: "ado://guide/epics",
        name: "Epic Management Guide",
        description: "How to structure Epics and their Tasks",
        text: include_str!("../resources/epic-guide.md"),
    },
    StaticResource {
        uri: "ado://guide/user",
        name: "User Guide",
        description: "Overview of every tool with usage examples",
        text: include_str!("../resources/user-guide.md"),
    },
    StaticResource {
        uri: "ado://guide/workflow",
        name: "Epic Creation Workflow",
        description: "Step-by-step workflow for creating an Epic with Tasks",
        text: include_str!("../resources/workflow-guide.md"),
    },
];

/// Every resource the server advertises.
pub fn list() -> Vec<ResourceDefinition> {
    RESOURCES
        .iter()
        .map(|r| ResourceDefinition {
            uri: r.uri.to_string(),
            name: r.name.to_string(),
            description: r.description.to_string(),
            mime_type: MARKDOWN.to_string(),
        })
        .collect()
}

/// Contents of the resource at `uri`, if it exists.
pub fn read(uri: &str) -> Option<ResourceContents> {
    RESOURCES
        .iter()
        .find(|r| r.uri == uri)
        .map(|r| ResourceContents {
            uri: r.uri.to_string(),
            mime_type: MARKDOWN.to_string(),
            text: r.text.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_has_unique_uris() {
        let resources = list();
        assert_eq!(resources.len(), 5);

        let mut uris: Vec<_> = resources.iter().map(|r| r.uri.as_str()).collect();
        uris.sort();
        uris.dedup();
        assert_eq!(uris.len(), 5);
    }

    #[test]
    fn test_every_listed_resource_is_readable() {
        for resource in list() {
            let contents = read(&resource.uri).unwrap();
            assert!(!contents.text.trim().is_empty(), "{} is empty", resource.uri);
        }
    }

    #[test]
    fn test_template_mentions_delimiter() {
        let template = read("ado://standard/template").unwrap();
        assert!(template.text.contains("|||"));
    }

    #[test]
    fn test_unknown_uri() {
        assert!(read("ado://guide/missing").is_none());
    }
}
