//! Prompt templates bundled at compile time.

/// Influenxers - influencer video marketing agent
pub const INFLUENXERS: &str = include_str!("defaults/influenxers.md");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_every_tool() {
        for tool in [
            "ingest_product",
            "scrape_tiktok_inspiration",
            "analyze_creator_style",
            "generate_script",
            "suggest_edits",
        ] {
            assert!(INFLUENXERS.contains(tool), "prompt should mention {}", tool);
        }
    }

    #[test]
    fn test_prompt_identity() {
        assert!(INFLUENXERS.starts_with("You are Influenxers"));
    }
}
