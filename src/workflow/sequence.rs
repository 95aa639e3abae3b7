// Work item code minting

use super::errors::{StoreError, WorkflowError};
use super::traits::{WorkflowStore, WorkflowTx};

/// `^[A-Z][A-Z0-9]+$`
pub fn validate_prefix(prefix: &str) -> Result<(), WorkflowError> {
    let mut chars = prefix.chars();
    let valid = matches!(chars.next(), Some(first) if first.is_ascii_uppercase())
        && prefix.len() >= 2
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(WorkflowError::InvalidInput {
            field: "prefix",
            reason: format!("{prefix:?} must be uppercase letters or digits after a letter"),
        })
    }
}

/// Draw the next number for `prefix` inside `tx` and format the code
pub async fn mint_code(
    tx: &mut Box<dyn WorkflowTx>,
    prefix: &str,
    actor: &str,
) -> Result<String, WorkflowError> {
    validate_prefix(prefix)?;
    let n = tx.next_sequence(prefix, actor).await?;
    Ok(format!("{prefix}-{n}"))
}

/// Standalone allocation in its own transaction
pub async fn next_sequence(
    store: &dyn WorkflowStore,
    prefix: &str,
    actor: &str,
) -> Result<i64, WorkflowError> {
    validate_prefix(prefix)?;
    let mut tx = store.begin().await?;
    let n = tx.next_sequence(prefix, actor).await?;
    tx.commit().await?;
    Ok(n)
}

/// Split `REQ-12` into `("REQ", 12)`
pub fn parse_code(code: &str) -> Result<(&str, i64), StoreError> {
    code.rsplit_once('-')
        .and_then(|(prefix, n)| n.parse::<i64>().ok().map(|n| (prefix, n)))
        .ok_or_else(|| StoreError::Corrupt(format!("malformed work item code {code:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::memory::InMemoryStore;

    #[test]
    fn test_prefix_shape() {
        assert!(validate_prefix("REQ").is_ok());
        assert!(validate_prefix("G2").is_ok());
        assert!(validate_prefix("R").is_err());
        assert!(validate_prefix("2G").is_err());
        assert!(validate_prefix("Req").is_err());
        assert!(validate_prefix("RE-Q").is_err());
        assert!(validate_prefix("").is_err());
    }

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code("BUG-42").unwrap(), ("BUG", 42));
        assert!(parse_code("BUG42").is_err());
        assert!(parse_code("BUG-x").is_err());
    }

    #[tokio::test]
    async fn test_counters_are_independent_per_prefix() {
        let store = InMemoryStore::new();
        assert_eq!(next_sequence(&store, "REQ", "ann").await.unwrap(), 1);
        assert_eq!(next_sequence(&store, "REQ", "ann").await.unwrap(), 2);
        assert_eq!(next_sequence(&store, "BUG", "ann").await.unwrap(), 1);

        let mut tx = store.begin().await.unwrap();
        assert_eq!(mint_code(&mut tx, "REQ", "ann").await.unwrap(), "REQ-3");
    }
}
