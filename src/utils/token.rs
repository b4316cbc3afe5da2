use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Session tokens are the only externally visible session handle.
pub fn generate_session_token() -> String {
    let random: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("SESSION-{}", random.to_uppercase())
}

pub fn generate_access_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_token_shape() {
        let token = generate_session_token();
        assert!(token.starts_with("SESSION-"));
        assert_eq!(token.len(), "SESSION-".len() + 16);
        assert_eq!(token, token.to_uppercase());
    }

    #[test]
    fn session_tokens_differ() {
        assert_ne!(generate_session_token(), generate_session_token());
    }

    #[test]
    fn access_token_length() {
        assert_eq!(generate_access_token(32).len(), 32);
    }
}
