/// Render a token for logs: the first four characters followed by an ellipsis.
pub fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{prefix}…")
    }
}
