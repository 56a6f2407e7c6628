mod common;

use argon2::Params;
use common::{TempDb, ready_manager};
use storefront::StorefrontError;
use storefront::auth::{CredentialHasher, CredentialVerifier, NewAccount, VerifyOutcome};
use storefront::db::models::{NewProduct, NewProfile};
use storefront::db::{EngineOptions, queries};
use storefront::service::accounts::AccountService;

fn fast_hasher() -> CredentialHasher {
    CredentialHasher::with_params(Params::new(1024, 1, 1, None).expect("valid params"))
}

fn alice() -> NewAccount {
    NewAccount {
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password: "correct-horse".to_string(),
    }
}

#[tokio::test]
async fn register_then_authenticate() {
    let db = TempDb::new("accounts-login");
    let manager = ready_manager(&db, EngineOptions::default()).await;
    let accounts = AccountService::with_hasher(manager.clone(), fast_hasher());

    let user = accounts.register(alice()).await.expect("register failed");
    assert_eq!(user.username, "alice");
    assert!(!user.disabled);
    assert_ne!(user.password, "correct-horse");
    assert!(user.password.starts_with("$argon2id$"));

    let logged_in = accounts
        .authenticate("alice", "correct-horse")
        .await
        .expect("login failed");
    assert_eq!(logged_in.id, user.id);

    assert!(matches!(
        accounts.authenticate("alice", "wrong").await,
        Err(StorefrontError::AuthenticationDenied)
    ));
    assert!(matches!(
        accounts.authenticate("nobody", "correct-horse").await,
        Err(StorefrontError::AuthenticationDenied)
    ));
    manager.close().await.unwrap();
}

#[tokio::test]
async fn duplicate_username_is_conflict() {
    let db = TempDb::new("accounts-dup");
    let manager = ready_manager(&db, EngineOptions::default()).await;
    let accounts = AccountService::with_hasher(manager.clone(), fast_hasher());

    accounts.register(alice()).await.unwrap();
    let mut again = alice();
    again.email = "other@example.com".to_string();
    assert!(matches!(
        accounts.register(again).await,
        Err(StorefrontError::Conflict(_))
    ));

    let stats = manager.session_stats().await.unwrap();
    assert_eq!(stats.rolled_back, 1);
    assert_eq!(stats.opened, stats.closed);
    manager.close().await.unwrap();
}

#[tokio::test]
async fn invalid_account_never_reaches_storage() {
    let db = TempDb::new("accounts-invalid");
    let manager = ready_manager(&db, EngineOptions::default()).await;
    let accounts = AccountService::with_hasher(manager.clone(), fast_hasher());

    let mut bad = alice();
    bad.password = String::new();
    assert!(matches!(
        accounts.register(bad).await,
        Err(StorefrontError::EmptySecret)
    ));
    assert_eq!(manager.session_stats().await.unwrap().opened, 0);
    manager.close().await.unwrap();
}

#[tokio::test]
async fn corrupted_stored_credential_denies_login() {
    let db = TempDb::new("accounts-corrupt");
    let manager = ready_manager(&db, EngineOptions::default()).await;
    let accounts = AccountService::with_hasher(manager.clone(), fast_hasher());

    let user = accounts.register(alice()).await.unwrap();
    manager
        .scoped_connection(|conn| {
            Box::pin(async move {
                sqlx::query("UPDATE users SET password = 'not-a-valid-hash-string' WHERE id = ?")
                    .bind(user.id)
                    .execute(conn)
                    .await?;
                Ok::<_, StorefrontError>(())
            })
        })
        .await
        .unwrap();

    assert!(matches!(
        accounts.authenticate("alice", "correct-horse").await,
        Err(StorefrontError::AuthenticationDenied)
    ));
    manager.close().await.unwrap();
}

#[tokio::test]
async fn overpriced_stored_credential_denies_login() {
    let db = TempDb::new("accounts-overpriced");
    let manager = ready_manager(&db, EngineOptions::default()).await;
    let accounts = AccountService::with_hasher(manager.clone(), fast_hasher());

    let user = accounts.register(alice()).await.unwrap();
    let hostile = "$argon2id$v=19$m=4294967295,t=1,p=1$c2FsdHNhbHRzYWx0c2FsdA$c2FsdHNhbHRzYWx0c2FsdHNhbHRzYWx0";
    assert_eq!(
        CredentialVerifier.verify(hostile, "correct-horse"),
        VerifyOutcome::VerifierFailure
    );
    manager
        .scoped_connection(|conn| {
            Box::pin(async move {
                sqlx::query("UPDATE users SET password = ? WHERE id = ?")
                    .bind(hostile)
                    .bind(user.id)
                    .execute(conn)
                    .await?;
                Ok::<_, StorefrontError>(())
            })
        })
        .await
        .unwrap();

    assert!(matches!(
        accounts.authenticate("alice", "correct-horse").await,
        Err(StorefrontError::AuthenticationDenied)
    ));
    manager.close().await.unwrap();
}

#[tokio::test]
async fn disabled_user_is_denied() {
    let db = TempDb::new("accounts-disabled");
    let manager = ready_manager(&db, EngineOptions::default()).await;
    let accounts = AccountService::with_hasher(manager.clone(), fast_hasher());

    let user = accounts.register(alice()).await.unwrap();
    manager
        .scoped_connection(|conn| {
            Box::pin(async move { queries::set_user_disabled(conn, user.id, true).await })
        })
        .await
        .unwrap();

    assert!(matches!(
        accounts.authenticate("alice", "correct-horse").await,
        Err(StorefrontError::AuthenticationDenied)
    ));
    manager.close().await.unwrap();
}

#[tokio::test]
async fn profile_cart_and_checkout_lookups() {
    let db = TempDb::new("accounts-cart");
    let manager = ready_manager(&db, EngineOptions::default()).await;
    let accounts = AccountService::with_hasher(manager.clone(), fast_hasher());

    let user = accounts.register(alice()).await.unwrap();
    assert!(accounts.profile_for_user(user.id).await.unwrap().is_none());

    let profile = accounts
        .create_profile(
            user.id,
            NewProfile {
                first_name: Some("Alice".to_string()),
                address: Some("1 Main St".to_string()),
                ..NewProfile::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        accounts.profile_for_user(user.id).await.unwrap(),
        Some(profile.clone())
    );

    let checkout = manager
        .scoped_session(|session| {
            Box::pin(async move {
                let conn = session.conn().await?;
                let mug = queries::insert_product(
                    &mut *conn,
                    &NewProduct {
                        name: "mug".to_string(),
                        description: "stoneware".to_string(),
                        price: 8.0,
                        category: "kitchen".to_string(),
                        image_url: None,
                        stock_quantity: 10,
                    },
                )
                .await?;
                let cart = queries::create_cart(&mut *conn, profile.id).await?;
                queries::add_cart_item(&mut *conn, cart.id, mug.id, 3).await?;

                let found = queries::cart_for_profile(&mut *conn, profile.id)
                    .await?
                    .ok_or(StorefrontError::NotFound)?;
                assert_eq!(found.id, cart.id);

                let items = queries::items_in_cart(&mut *conn, cart.id).await?;
                assert_eq!(items.len(), 1);
                let product = queries::product_by_id(&mut *conn, items[0].product_id).await?;
                assert_eq!(product.name, "mug");

                let checkout =
                    queries::checkout_cart(&mut *conn, cart.id, "1 Main St", "card").await?;
                session.commit().await?;
                Ok::<_, StorefrontError>(checkout)
            })
        })
        .await
        .unwrap();

    assert_eq!(checkout.order_total, 24.0);
    assert_eq!(checkout.order_status, "pending");
    manager.close().await.unwrap();
}

/// Startup, credential round trip and shutdown in one pass.
#[tokio::test]
async fn storefront_lifecycle_scenario() {
    let db = TempDb::new("scenario");
    let options = EngineOptions {
        pool_size: 5,
        ..EngineOptions::default()
    };
    let manager = ready_manager(&db, options).await;
    manager.ensure_schema().await.expect("schema not idempotent");

    let stored = fast_hasher().hash("correct-horse").unwrap();
    let verifier = CredentialVerifier;
    assert_eq!(verifier.verify(&stored, "correct-horse"), VerifyOutcome::Match);
    assert_eq!(verifier.verify(&stored, "wrong"), VerifyOutcome::Mismatch);

    manager.close().await.unwrap();
    let res = manager
        .scoped_connection(|_conn| Box::pin(async move { Ok::<_, StorefrontError>(()) }))
        .await;
    assert!(matches!(res, Err(StorefrontError::NotInitialized)));
}
