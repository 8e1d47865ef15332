//! Verify-then-authorize flows and their transport mapping.

mod common;

use common::{Harness, tamper_signature};
use warden_auth::{
    AccessOptions, AllowBasis, DenialStatus, GuardedResource, ToResponse, TransportResponse,
};
use warden_core::{DenyReason, Principal};

#[derive(Debug)]
struct Document {
    id: u32,
    owner: String,
    child: String,
}

impl GuardedResource for Document {
    fn resource_id(&self) -> String {
        format!("document:{}", self.id)
    }
}

fn document(owner: &str) -> Document {
    Document {
        id: 7,
        owner: owner.to_string(),
        child: "child-1".to_string(),
    }
}

fn owns(doc: &Document, subject: &str) -> bool {
    doc.owner == subject
}

fn educator_of(doc: &Document, principal: &Principal) -> bool {
    principal.subject == format!("educator-of-{}", doc.child)
}

/// Full request path: verify, then authorize, then map to a response.
async fn handle(
    h: &Harness,
    token: &str,
    doc: &Document,
    options: &AccessOptions<Document>,
    status: DenialStatus,
) -> Result<AllowBasis, TransportResponse> {
    let principal = h
        .warden
        .verify(token, None)
        .await
        .map_err(|reason| reason.to_response())?;
    h.warden
        .guard()
        .require(&principal, doc, owns, options, None)
        .await
        .map_err(|denied| denied.to_response(status))
}

#[tokio::test]
async fn test_owner_allowed_other_denied() {
    let h = Harness::new();
    let doc = document("alice");
    let options = AccessOptions::new();

    let alice = h.issue("alice");
    let bob = h.issue("bob");

    assert_eq!(
        handle(&h, &alice.token, &doc, &options, DenialStatus::Forbidden).await,
        Ok(AllowBasis::Owner)
    );
    assert_eq!(
        handle(&h, &bob.token, &doc, &options, DenialStatus::Forbidden).await,
        Err(TransportResponse::FORBIDDEN)
    );

    let denied = h.audit.events_named("authorization_denied");
    assert_eq!(denied.len(), 1);
    assert!(denied[0].description().contains("document:7"));
}

#[tokio::test]
async fn test_allow_role_bypasses_ownership() {
    let h = Harness::new();
    let doc = document("alice");
    let options = AccessOptions::new().allow_role("admin");

    let admin = h.issue_with_role("root", "admin");
    let parent = h.issue_with_role("carol", "parent");

    assert_eq!(
        handle(&h, &admin.token, &doc, &options, DenialStatus::Forbidden).await,
        Ok(AllowBasis::Role)
    );
    assert_eq!(
        handle(&h, &parent.token, &doc, &options, DenialStatus::Forbidden).await,
        Err(TransportResponse::FORBIDDEN)
    );
}

#[tokio::test]
async fn test_delegate_allowed_after_ownership() {
    let h = Harness::new();
    let doc = document("alice");
    let options = AccessOptions::new().allow_delegates(educator_of);

    let educator = h.issue("educator-of-child-1");
    let stranger = h.issue("educator-of-child-2");

    assert_eq!(
        handle(&h, &educator.token, &doc, &options, DenialStatus::Forbidden).await,
        Ok(AllowBasis::Delegate)
    );
    assert_eq!(
        handle(&h, &stranger.token, &doc, &options, DenialStatus::Forbidden).await,
        Err(TransportResponse::FORBIDDEN)
    );
}

#[tokio::test]
async fn test_not_found_policy_hides_existence() {
    let h = Harness::new();
    let doc = document("alice");
    let options = AccessOptions::new();
    let bob = h.issue("bob");

    let denied = handle(&h, &bob.token, &doc, &options, DenialStatus::NotFound)
        .await
        .unwrap_err();
    assert_eq!(denied, DenialStatus::NotFound.missing_response());
    assert_eq!(denied.status, 404);
}

#[tokio::test]
async fn test_every_rejection_is_the_same_401() {
    let h = Harness::new();
    let doc = document("alice");
    let options = AccessOptions::new();

    let alice = h.issue("alice");
    let revoked = h.issue("alice");
    h.warden.revoke_token(&revoked.token, None).await.unwrap();

    for token in [
        "garbage".to_string(),
        tamper_signature(&alice.token),
        revoked.token.clone(),
    ] {
        let response = handle(&h, &token, &doc, &options, DenialStatus::Forbidden)
            .await
            .unwrap_err();
        assert_eq!(response, TransportResponse::UNAUTHENTICATED);
        assert_eq!(response.body, "unauthenticated");
    }
}

#[tokio::test]
async fn test_partner_principal_authorized_like_any_other() {
    let h = Harness::new();
    let doc = document("partner-user");
    let issued = h.issue_partner("partner-user");

    let principal = h.warden.verify(&issued.token, None).await.unwrap();
    let decision = h
        .warden
        .authorize(&principal, &doc, owns, &AccessOptions::new(), None)
        .await;
    assert!(decision.is_allowed());
    assert_eq!(h.audited("authorization_granted"), 1);
}

#[tokio::test]
async fn test_denial_reason_stays_internal() {
    let h = Harness::new();
    let doc = document("alice");
    let bob = h.issue("bob");
    let principal = h.warden.verify(&bob.token, None).await.unwrap();

    let denied = h
        .warden
        .guard()
        .require(&principal, &doc, owns, &AccessOptions::new(), None)
        .await
        .unwrap_err();
    assert_eq!(denied.reason(), DenyReason::NotAuthorized);
    assert_eq!(denied.to_string(), "access denied");
}
