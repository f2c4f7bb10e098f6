//! Descriptors for the artifacts MindScape asks models to produce.

use super::{FieldKind, SchemaDescriptor};

/// A full mind map: topic plus nested sub-topics.
pub fn mind_map() -> SchemaDescriptor {
    SchemaDescriptor::new("mind-map")
        .marker("topic")
        .require("topic", FieldKind::String)
        .require("subTopics", FieldKind::Array)
}

/// A nested expansion of a single node.
pub fn nested_expansion() -> SchemaDescriptor {
    SchemaDescriptor::new("nested-expansion")
        .marker("topic")
        .marker("subCategories")
        .require("topic", FieldKind::String)
        .require("subCategories", FieldKind::Array)
}

pub fn quiz() -> SchemaDescriptor {
    SchemaDescriptor::new("quiz")
        .marker("questions")
        .marker("topic")
        .require("topic", FieldKind::String)
        .require("questions", FieldKind::Array)
}

/// Two-topic comparison. Models sometimes return only the similarities or
/// differences block, which still counts as the artifact when searching.
pub fn comparison() -> SchemaDescriptor {
    SchemaDescriptor::new("comparison")
        .marker("compareData")
        .marker("similarities")
        .marker("differences")
        .require("topic", FieldKind::String)
        .require("compareData", FieldKind::Object)
}

pub fn related_questions() -> SchemaDescriptor {
    SchemaDescriptor::new("related-questions").require("questions", FieldKind::Array)
}

pub fn chat_answer() -> SchemaDescriptor {
    SchemaDescriptor::new("chat-answer").require("answer", FieldKind::String)
}

/// Look a descriptor up by its name.
pub fn lookup(name: &str) -> Option<SchemaDescriptor> {
    match name {
        "mind-map" => Some(mind_map()),
        "nested-expansion" => Some(nested_expansion()),
        "quiz" => Some(quiz()),
        "comparison" => Some(comparison()),
        "related-questions" => Some(related_questions()),
        "chat-answer" => Some(chat_answer()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_by_name() {
        for name in [
            "mind-map",
            "nested-expansion",
            "quiz",
            "comparison",
            "related-questions",
            "chat-answer",
        ] {
            assert_eq!(lookup(name).map(|s| s.name().to_string()).as_deref(), Some(name));
        }
        assert!(lookup("poem").is_none());
    }

    #[test]
    fn partial_comparison_matches_shape() {
        let schema = comparison();
        assert!(schema.matches_shape(&json!({"similarities": ["both fly"]})));
        assert!(schema.validate(&json!({"similarities": ["both fly"]})).is_err());
    }

    #[test]
    fn mind_map_validates() {
        let map = json!({"topic": "Cats", "shortTitle": "Cats", "icon": "cat", "subTopics": []});
        assert!(mind_map().validate(&map).is_ok());
    }
}
