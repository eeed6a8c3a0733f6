pub fn is_access_key_valid(supplied: Option<&str>, hard_key: &str) -> bool {
    supplied == Some(hard_key)
}
