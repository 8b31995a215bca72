/// Separator used for recipient, CC and attachment lists.
pub const LIST_DELIMITER: char = ';';

/// Split a delimited list into its non-empty segments, in order.
///
/// Segments are returned as-is; only empty ones (from leading, trailing or
/// doubled delimiters) are dropped. A missing list is the same as an empty one.
pub fn split_list(input: Option<&str>) -> Vec<&str> {
    match input {
        Some(s) => s.split(LIST_DELIMITER).filter(|s| !s.is_empty()).collect(),
        None => Vec::new(),
    }
}
