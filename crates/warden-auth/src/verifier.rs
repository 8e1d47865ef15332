//! Token verification.
//!
//! One path for every protected request:
//! `Received -> SignatureChecked -> ClaimsValidated -> RevocationChecked -> Accepted`,
//! with a rejection reachable from every step. The outcome is a tagged
//! result, never a panic or an infrastructure error.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};
use warden_audit::{AuditEvent, AuditKind, AuditSink};
use warden_config::SourceSection;
use warden_core::{Clock, Principal, RejectReason, RequestMeta, Timestamp, TokenKey};
use warden_revocation::RevocationChecker;
use warden_token::{SigningKey, Token, TokenCodec, TokenError, TokenResult};

/// Where a verification attempt currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationStage {
    /// The raw token arrived.
    Received,
    /// A trusted key verified the signature.
    SignatureChecked,
    /// Issuer, audience, expiry and required claims passed.
    ClaimsValidated,
    /// The token is not revoked.
    RevocationChecked,
    /// A principal was produced.
    Accepted,
}

impl fmt::Display for VerificationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::SignatureChecked => "signature_checked",
            Self::ClaimsValidated => "claims_validated",
            Self::RevocationChecked => "revocation_checked",
            Self::Accepted => "accepted",
        };
        f.write_str(s)
    }
}

/// One trusted token origin: its key and the issuer/audience it must carry.
#[derive(Clone)]
pub struct TrustedSource {
    /// Name recorded into [`Principal::source`].
    pub name: String,
    /// Expected `iss`.
    pub issuer: String,
    /// Expected `aud`.
    pub audience: String,
    /// Codec holding this source's key.
    pub codec: Arc<TokenCodec>,
}

impl TrustedSource {
    /// Create a source.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        codec: Arc<TokenCodec>,
    ) -> Self {
        Self {
            name: name.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            codec,
        }
    }

    /// Build a source from its configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret does not decode or is too short.
    pub fn from_config(section: &SourceSection, clock: Arc<dyn Clock>) -> TokenResult<Self> {
        let bytes = section.secret_bytes().map_err(TokenError::InvalidKey)?;
        let key = SigningKey::new(bytes.as_slice())?;
        Ok(Self::new(
            section.name.clone(),
            section.issuer.clone(),
            section.audience.clone(),
            Arc::new(TokenCodec::new(key, clock)),
        ))
    }
}

impl fmt::Debug for TrustedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustedSource")
            .field("name", &self.name)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

/// Validates tokens against an ordered list of trusted sources and the
/// revocation tiers.
#[derive(Debug)]
pub struct TokenVerifier {
    sources: Vec<TrustedSource>,
    checker: Arc<RevocationChecker>,
    audit: Arc<dyn AuditSink>,
    record_successes: bool,
}

impl TokenVerifier {
    /// Create a verifier. Sources are tried in the given order.
    #[must_use]
    pub fn new(
        sources: Vec<TrustedSource>,
        checker: Arc<RevocationChecker>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            sources,
            checker,
            audit,
            record_successes: true,
        }
    }

    /// Whether accepted tokens are audited. Rejections always are.
    #[must_use]
    pub fn with_success_auditing(mut self, enabled: bool) -> Self {
        self.record_successes = enabled;
        self
    }

    /// The trusted sources, in match order.
    #[must_use]
    pub fn sources(&self) -> &[TrustedSource] {
        &self.sources
    }

    /// Look up a source by name.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&TrustedSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// The revocation checker consulted after claims pass.
    #[must_use]
    pub fn checker(&self) -> &Arc<RevocationChecker> {
        &self.checker
    }

    /// Verify a raw token.
    ///
    /// Every outcome is audited with the caller's request context:
    /// `verification_success` on accept (unless disabled),
    /// `verification_failure` with the reason on reject.
    ///
    /// # Errors
    ///
    /// Returns the [`RejectReason`]. Map it to a transport response with
    /// [`ToResponse`](crate::ToResponse); never echo it to the client.
    pub async fn verify(
        &self,
        token: &str,
        meta: Option<&RequestMeta>,
    ) -> Result<Principal, RejectReason> {
        let outcome = self.evaluate(token).await;

        match &outcome {
            Ok(principal) => {
                debug!(subject = %principal.subject, source = %principal.source, stage = %VerificationStage::Accepted, "Token accepted");
                if self.record_successes {
                    self.record(
                        AuditKind::VerificationSuccess {
                            subject: principal.subject.clone(),
                            source: principal.source.clone(),
                        },
                        meta,
                    )
                    .await;
                }
            },
            Err(reason) => {
                if reason.is_infrastructure() {
                    warn!(reason = %reason, "Token rejected, revocation status unknown");
                } else {
                    debug!(reason = %reason, "Token rejected");
                }
                self.record(AuditKind::VerificationFailure { reason: *reason }, meta)
                    .await;
            },
        }
        outcome
    }

    async fn record(&self, kind: AuditKind, meta: Option<&RequestMeta>) {
        self.audit
            .record(AuditEvent::new(kind, Timestamp::now()).with_request(meta))
            .await;
    }

    async fn evaluate(&self, token: &str) -> Result<Principal, RejectReason> {
        trace!(stage = %VerificationStage::Received);
        let (source, claims) = self.match_source(token)?;
        trace!(stage = %VerificationStage::ClaimsValidated, source = %source.name);

        let key = TokenKey::from_token(token);
        match self.checker.is_revoked(&key).await {
            Ok(false) => {},
            Ok(true) => return Err(RejectReason::Revoked),
            Err(e) => {
                warn!(key = %key, error = %e, "Revocation check failed, rejecting");
                return Err(RejectReason::StoreUnavailable);
            },
        }
        trace!(stage = %VerificationStage::RevocationChecked, key = %key);

        Ok(Principal::new(claims.subject, claims.role, source.name.clone()))
    }

    /// Find the first source whose key and claims both accept the token.
    ///
    /// A malformed token stops the search. A signature failure moves on to
    /// the next source. If no source accepts, the claim failure of the first
    /// source whose key verified the signature is reported, else
    /// `BadSignature`.
    fn match_source(&self, token: &str) -> Result<(&TrustedSource, Token), RejectReason> {
        let mut claim_failure = None;

        for source in &self.sources {
            let parsed = match source.codec.parse(token) {
                Ok(parsed) => parsed,
                Err(e) if e.is_signature_failure() => continue,
                Err(e) => return Err(e.reject_reason().unwrap_or(RejectReason::Malformed)),
            };
            trace!(stage = %VerificationStage::SignatureChecked, source = %source.name);

            match source
                .codec
                .validate_claims(parsed, &source.issuer, &source.audience)
            {
                Ok(claims) => return Ok((source, claims)),
                Err(e) => {
                    claim_failure
                        .get_or_insert(e.reject_reason().unwrap_or(RejectReason::Malformed));
                },
            }
        }

        Err(claim_failure.unwrap_or(RejectReason::BadSignature))
    }
}
