//! HMAC-SHA256 token codec.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, Header, Validation};
use serde_json::{Map, Value};
use tracing::debug;
use warden_core::{Clock, Role, Timestamp, TokenKey};

use crate::claims::{
    CLAIM_AUD, CLAIM_EXP, CLAIM_IAT, CLAIM_ISS, CLAIM_ROLE, CLAIM_SUB, IssueRequest, IssuedToken,
    ParsedToken, Token,
};
use crate::error::{TokenError, TokenResult};
use crate::key::SigningKey;

/// The only algorithm the codec signs with or accepts.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// Issues and parses tokens for one signing key.
///
/// The codec is the sole owner of its key. Signature verification is pinned
/// to [`ALGORITHM`]; the algorithm named in a token header is checked, never
/// trusted.
pub struct TokenCodec {
    key: SigningKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &ALGORITHM)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Create a codec for `key`, reading time from `clock`.
    #[must_use]
    pub fn new(key: SigningKey, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Claims are checked by `validate_claims` against the injected clock.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            key,
            validation,
            clock,
        }
    }

    /// The clock this codec reads time from.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Issue a signed token.
    ///
    /// Extra claims are written first, then `role`, then the five protected
    /// claims, so no extra claim can replace `sub`, `iat`, `exp`, `iss` or
    /// `aud`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidRequest`] if the TTL is under one second
    /// or the expiry overflows, and [`TokenError::Encoding`] if signing fails.
    pub fn issue(&self, request: &IssueRequest) -> TokenResult<IssuedToken> {
        let ttl_secs = i64::try_from(request.ttl.as_secs())
            .map_err(|_| TokenError::InvalidRequest("ttl is out of range".into()))?;
        if ttl_secs <= 0 {
            return Err(TokenError::InvalidRequest(
                "ttl must be at least one second".into(),
            ));
        }

        let issued_at = self.clock.now();
        let iat = issued_at.unix();
        let exp = iat
            .checked_add(ttl_secs)
            .ok_or_else(|| TokenError::InvalidRequest("expiry overflows".into()))?;
        let expires_at = Timestamp::from_unix(exp)
            .ok_or_else(|| TokenError::InvalidRequest("expiry is not representable".into()))?;

        let mut claims = request.extra_claims.clone();
        if let Some(role) = &request.role {
            claims.insert(CLAIM_ROLE.into(), Value::from(role.as_str()));
        }
        claims.insert(CLAIM_SUB.into(), Value::from(request.subject.as_str()));
        claims.insert(CLAIM_IAT.into(), Value::from(iat));
        claims.insert(CLAIM_EXP.into(), Value::from(exp));
        claims.insert(CLAIM_ISS.into(), Value::from(request.issuer.as_str()));
        claims.insert(CLAIM_AUD.into(), Value::from(request.audience.as_str()));

        let token = jsonwebtoken::encode(&Header::new(ALGORITHM), &claims, &self.key.encoding_key())
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        let key = TokenKey::from_token(&token);

        debug!(
            subject = %request.subject,
            issuer = %request.issuer,
            token_key = %key,
            expires_at = %expires_at,
            "token issued"
        );

        Ok(IssuedToken {
            token,
            key,
            issued_at: Timestamp::from_unix(iat).unwrap_or(issued_at),
            expires_at,
        })
    }

    /// Verify the signature and decode the claims.
    ///
    /// No claim is checked here, not even `exp`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::AlgorithmMismatch`] if the header names another algorithm
    /// - [`TokenError::BadSignature`] if the signature does not verify
    /// - [`TokenError::Malformed`] for anything structurally wrong, including
    ///   an unsigned `none` header
    pub fn parse(&self, token: &str) -> TokenResult<ParsedToken> {
        let data = jsonwebtoken::decode::<Map<String, Value>>(
            token,
            &self.key.decoding_key(),
            &self.validation,
        )?;
        Ok(ParsedToken::new(data.claims))
    }

    /// Check the required claims of a parsed token.
    ///
    /// Checks run in a fixed order: presence and type of all five protected
    /// claims, then expiry, then issuer, then audience.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as [`TokenError::MissingClaim`],
    /// [`TokenError::Expired`], [`TokenError::WrongIssuer`] or
    /// [`TokenError::WrongAudience`].
    pub fn validate_claims(
        &self,
        parsed: ParsedToken,
        expected_issuer: &str,
        expected_audience: &str,
    ) -> TokenResult<Token> {
        let claims = parsed.into_claims();

        let subject = string_claim(&claims, CLAIM_SUB)?;
        let issued_at = time_claim(&claims, CLAIM_IAT)?;
        let expires_at = time_claim(&claims, CLAIM_EXP)?;
        let issuer = string_claim(&claims, CLAIM_ISS)?;
        let audience = string_claim(&claims, CLAIM_AUD)?;

        if expires_at <= self.clock.now() {
            return Err(TokenError::Expired);
        }
        if issuer != expected_issuer {
            return Err(TokenError::WrongIssuer);
        }
        if audience != expected_audience {
            return Err(TokenError::WrongAudience);
        }

        let role = claims
            .get(CLAIM_ROLE)
            .and_then(Value::as_str)
            .map(Role::new);

        Ok(Token {
            subject,
            issuer,
            audience,
            issued_at,
            expires_at,
            role,
            claims,
        })
    }

    /// Parse and validate in one step.
    ///
    /// # Errors
    ///
    /// Any error of [`parse`](Self::parse) or
    /// [`validate_claims`](Self::validate_claims).
    pub fn decode(
        &self,
        token: &str,
        expected_issuer: &str,
        expected_audience: &str,
    ) -> TokenResult<Token> {
        let parsed = self.parse(token)?;
        self.validate_claims(parsed, expected_issuer, expected_audience)
    }

    /// Read `exp` from a token signed by this key, without enforcing it.
    ///
    /// Used to size revocation records for tokens that may already be
    /// expired.
    ///
    /// # Errors
    ///
    /// Any error of [`parse`](Self::parse), or
    /// [`TokenError::MissingClaim`] if `exp` is absent.
    pub fn peek_expiry(&self, token: &str) -> TokenResult<Timestamp> {
        let parsed = self.parse(token)?;
        time_claim(parsed.claims(), CLAIM_EXP)
    }
}

fn string_claim(claims: &Map<String, Value>, name: &'static str) -> TokenResult<String> {
    claims
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(TokenError::MissingClaim(name))
}

fn time_claim(claims: &Map<String, Value>, name: &'static str) -> TokenResult<Timestamp> {
    claims
        .get(name)
        .and_then(Value::as_i64)
        .and_then(Timestamp::from_unix)
        .ok_or(TokenError::MissingClaim(name))
}
