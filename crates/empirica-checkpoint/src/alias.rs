/// A resolved checkpoint-store session alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alias {
    /// `latest` — most recent checkpoint across all sessions and agents.
    Latest,
    /// `latest:active` — most recent checkpoint among non-terminal sessions.
    LatestActive,
    /// `latest:<ai_id>` — most recent checkpoint written by `ai_id`.
    LatestByAgent(String),
    /// `latest:active:<ai_id>` — most recent non-terminal checkpoint by `ai_id`.
    LatestActiveByAgent(String),
    /// Not an alias — treat the input as a concrete session id.
    Concrete(String),
}

/// Parse a session-id-or-alias string. Resolution into a concrete session id
/// happens in the store (it needs to read checkpoint timestamps); this
/// function only classifies the shape of the input.
pub fn parse(input: &str) -> Alias {
    if input == "latest" {
        return Alias::Latest;
    }
    if input == "latest:active" {
        return Alias::LatestActive;
    }
    if let Some(rest) = input.strip_prefix("latest:active:") {
        return Alias::LatestActiveByAgent(rest.to_string());
    }
    if let Some(rest) = input.strip_prefix("latest:") {
        return Alias::LatestByAgent(rest.to_string());
    }
    Alias::Concrete(input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_latest_parses() {
        assert_eq!(parse("latest"), Alias::Latest);
    }

    #[test]
    fn latest_active_parses() {
        assert_eq!(parse("latest:active"), Alias::LatestActive);
    }

    #[test]
    fn latest_by_agent_parses() {
        assert_eq!(
            parse("latest:agent-a"),
            Alias::LatestByAgent("agent-a".into())
        );
    }

    #[test]
    fn latest_active_by_agent_parses() {
        assert_eq!(
            parse("latest:active:agent-a"),
            Alias::LatestActiveByAgent("agent-a".into())
        );
    }

    #[test]
    fn concrete_session_id_passes_through() {
        assert_eq!(
            parse("9b1d-session"),
            Alias::Concrete("9b1d-session".into())
        );
    }
}
