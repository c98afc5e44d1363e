//! Rendering command tokens for logs and error messages.
//!
//! Commands are always executed from token vectors; quoting here only makes
//! the logged form copy-pasteable into a POSIX shell.

/// Characters that make a token ambiguous when pasted into a shell.
const SHELL_META: &[char] = &[
    ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}', '<',
    '>', '|', '&', ';', '#', '~',
];

/// Quote a single token. Plain tokens are returned unchanged.
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', "'\\''"))
}

/// Quote and space-join a token list.
pub fn quote_args<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| quote_arg(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tokens_are_untouched() {
        assert_eq!(quote_arg("validate"), "validate");
        assert_eq!(quote_arg("region=us-east1"), "region=us-east1");
        assert_eq!(quote_arg("/opt/packer/templates/gcp.json"), "/opt/packer/templates/gcp.json");
    }

    #[test]
    fn tokens_with_spaces_are_quoted() {
        assert_eq!(quote_arg("my image"), "'my image'");
    }

    #[test]
    fn embedded_single_quotes_are_escaped() {
        assert_eq!(quote_arg("it's"), "'it'\\''s'");
    }

    #[test]
    fn empty_token_is_explicit() {
        assert_eq!(quote_arg(""), "''");
    }

    #[test]
    fn quote_args_joins_tokens() {
        let tokens = ["terraform", "plan", "-out", "/tmp/my plan"];
        assert_eq!(quote_args(&tokens), "terraform plan -out '/tmp/my plan'");
    }
}
