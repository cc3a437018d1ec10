/// Caption for a repost: the configured template followed by credit to the original owner.
pub fn build_caption(template: &str, owner: &str) -> String {
    let owner = owner.trim().trim_start_matches('@');
    format!("{}\n\nOriginal by @{}", template.trim_end(), owner)
}
