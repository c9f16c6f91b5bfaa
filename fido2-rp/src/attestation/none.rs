use ciborium::value::Value;

use super::{wrong_statement, AttestationContext, AttestationFormat, AttestationStatement};
use crate::{Error, Result};

/// The `none` format: the authenticator made no attestation, so there is nothing to check
/// beyond the statement being empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneFormat;

#[async_trait::async_trait]
impl AttestationFormat for NoneFormat {
    fn fmt(&self) -> &str {
        "none"
    }

    fn parse(&self, att_stmt: &[(Value, Value)]) -> Result<AttestationStatement> {
        if !att_stmt.is_empty() {
            return Err(Error::format("'none' attestation format: attStmt had fields"));
        }
        Ok(AttestationStatement::None)
    }

    async fn validate(&self, ctx: &mut AttestationContext<'_>) -> Result<()> {
        if *ctx.statement != AttestationStatement::None {
            return Err(wrong_statement(self.fmt()));
        }
        ctx.audit.set_info("attestation-type", "none");
        Ok(())
    }
}
