/// Header roles a table must carry to take part in the merge
pub(crate) const REQUIRED_ROLES: [&str; 4] = ["ID", "Type", "Source Text", "Translation"];

/// Returns true when every required role is contained, ignoring case, in some header.
/// Headers may carry extra text around the role name and may come in any order.
pub(crate) fn headers_match<S: AsRef<str>>(headers: &[S], required: &[&str]) -> bool {
    let headers: Vec<String> = headers
        .iter()
        .map(|header| header.as_ref().trim().to_lowercase())
        .collect();
    required.iter().all(|role| {
        let role = role.to_lowercase();
        headers.iter().any(|header| header.contains(&role))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_with_annotations_match() {
        let headers = ["Item ID", "Item Type", "Source Text (EN)", "Target Translation"];
        assert!(headers_match(&headers, &REQUIRED_ROLES));
    }

    #[test]
    fn test_missing_role_fails() {
        let headers = ["Item ID", "Item Type", "Source Text (EN)", "Notes"];
        assert!(!headers_match(&headers, &REQUIRED_ROLES));
        assert!(!headers_match::<&str>(&[], &REQUIRED_ROLES));
    }

    #[test]
    fn test_order_and_case_do_not_matter() {
        let headers = ["translation", "SOURCE TEXT", "comments", "type", "id"];
        assert!(headers_match(&headers, &REQUIRED_ROLES));
    }

    #[test]
    fn test_one_header_may_satisfy_several_roles() {
        let headers = ["ID / Type / Source Text / Translation"];
        assert!(headers_match(&headers, &REQUIRED_ROLES));
    }
}
