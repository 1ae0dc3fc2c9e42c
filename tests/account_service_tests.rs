//! Integration tests for the account lifecycle against a real SQLite store.

use std::sync::Arc;

use dosport::auth::Principal;
use dosport::config::{BootstrapAdminConfig, SecurityConfig};
use dosport::db::Store;
use dosport::domain::{AccountId, Gender, RoleName};
use dosport::services::{
    AccountError, AccountService, PasswordChangeRequest, ProfileUpdate, RegisterRequest,
    RoleRegistry, SeaOrmAccountService,
};

fn fast_security() -> SecurityConfig {
    SecurityConfig {
        argon2_memory_cost_kib: 64,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
        auto_migrate_password_hashes: true,
        bootstrap_admin: None,
    }
}

async fn new_store() -> Store {
    // One connection: the shared-cache in-memory database then never sees two
    // writers at once, and racing inserts are decided by the unique index.
    Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to open store")
}

async fn file_store(max_connections: u32) -> Store {
    let db_path =
        std::env::temp_dir().join(format!("dosport-account-test-{}.db", uuid::Uuid::new_v4()));
    Store::with_pool_options(&format!("sqlite:{}", db_path.display()), max_connections, 1)
        .await
        .expect("Failed to open file store")
}

async fn service_on(store: Store, security: &SecurityConfig) -> SeaOrmAccountService {
    let roles = RoleRegistry::load(&store).await.expect("roles");
    SeaOrmAccountService::new(store, roles, security).expect("service")
}

async fn setup() -> (Store, SeaOrmAccountService) {
    let store = new_store().await;
    let service = service_on(store.clone(), &fast_security()).await;
    (store, service)
}

fn register_request(username: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        password: password.to_string(),
        password_confirm: password.to_string(),
        first_name: "Test".to_string(),
        last_name: None,
    }
}

async fn register(service: &SeaOrmAccountService, username: &str, password: &str) -> Principal {
    service
        .register(register_request(username, password))
        .await
        .expect("register");
    service
        .authenticate(username, password)
        .await
        .expect("authenticate")
}

async fn admin(service: &SeaOrmAccountService) -> Principal {
    service
        .bootstrap_admin(&BootstrapAdminConfig {
            username: "root".to_string(),
            password: "rootpass".to_string(),
            first_name: "Root".to_string(),
        })
        .await
        .expect("bootstrap admin");
    service.authenticate("root", "rootpass").await.expect("admin login")
}

fn password_change(old: &str, new: &str) -> PasswordChangeRequest {
    PasswordChangeRequest {
        old_password: old.to_string(),
        new_password: new.to_string(),
        new_password_confirm: new.to_string(),
    }
}

#[tokio::test]
async fn register_and_login_scenario() {
    let (_, service) = setup().await;

    let profile = service
        .register(RegisterRequest {
            username: "alice1".to_string(),
            password: "secret1".to_string(),
            password_confirm: "secret1".to_string(),
            first_name: "Alice".to_string(),
            last_name: None,
        })
        .await
        .unwrap();

    assert_eq!(profile.username, "alice1");
    assert_eq!(profile.first_name, "Alice");
    assert_eq!(profile.gender, Gender::NotSelected);

    let json = serde_json::to_value(&profile).unwrap();
    assert!(json.get("password").is_none());
    assert!(json.get("password_hash").is_none());

    let principal = service.authenticate("alice1", "secret1").await.unwrap();
    assert_eq!(principal.id(), profile.id);
    assert_eq!(principal.username(), "alice1");
    assert_eq!(
        principal.roles().iter().copied().collect::<Vec<_>>(),
        vec![RoleName::User]
    );

    let err = service.authenticate("alice1", "wrong").await.unwrap_err();
    assert!(matches!(err, AccountError::InvalidCredentials));

    let err = service.authenticate("nobody", "secret1").await.unwrap_err();
    assert!(matches!(err, AccountError::NotFound(_)));
}

#[tokio::test]
async fn password_mismatch_persists_nothing() {
    let (store, service) = setup().await;

    let mut request = register_request("bob123", "secret1");
    request.password_confirm = "secret2".to_string();

    let err = service.register(request).await.unwrap_err();
    assert!(matches!(err, AccountError::ValidationFailed(_)));
    assert!(!store.username_exists("bob123").await.unwrap());
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let (store, service) = setup().await;

    service
        .register(register_request("carol", "secret1"))
        .await
        .unwrap();
    let err = service
        .register(register_request("carol", "other12"))
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::Conflict(_)));

    let carols = store
        .list_accounts()
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.username == "carol")
        .count();
    assert_eq!(carols, 1);

    // The original password still works
    service.authenticate("carol", "secret1").await.unwrap();
}

#[tokio::test]
async fn concurrent_registration_yields_one_winner() {
    let (store, service) = setup().await;
    let service = Arc::new(service);

    let a = {
        let service = service.clone();
        tokio::spawn(async move { service.register(register_request("racer", "secret1")).await })
    };
    let b = {
        let service = service.clone();
        tokio::spawn(async move { service.register(register_request("racer", "secret2")).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AccountError::Conflict(_))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(store.list_accounts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn registered_account_holds_user_role() {
    let (store, service) = setup().await;
    let principal = register(&service, "dave1", "secret1").await;

    let account = store
        .find_account_by_id(principal.id())
        .await
        .unwrap()
        .unwrap();
    assert!(account.enabled);
    assert!(account.roles.contains(&RoleName::User));
    assert!(account.password_hash.starts_with("$argon2id$"));
    assert_ne!(account.password_hash, "secret1");
}

#[tokio::test]
async fn non_admin_cannot_change_foreign_password() {
    let (_, service) = setup().await;
    let alice = register(&service, "alice1", "secret1").await;
    let bob = register(&service, "bob123", "secret2").await;

    // Even the correct old password does not help
    let err = service
        .change_password(&alice, bob.id(), password_change("secret2", "newpass"))
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::Forbidden(_)));

    service.authenticate("bob123", "secret2").await.unwrap();
}

#[tokio::test]
async fn self_password_change_verifies_old_password() {
    let (_, service) = setup().await;
    let alice = register(&service, "alice1", "secret1").await;

    let err = service
        .change_password(&alice, alice.id(), password_change("wrong1", "newpass"))
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::Forbidden(ref m) if m.contains("old password")));

    let err = service
        .change_password(
            &alice,
            alice.id(),
            PasswordChangeRequest {
                old_password: "secret1".to_string(),
                new_password: "newpass".to_string(),
                new_password_confirm: "newpas".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::ValidationFailed(_)));

    service
        .change_password(&alice, alice.id(), password_change("secret1", "newpass"))
        .await
        .unwrap();

    assert!(matches!(
        service.authenticate("alice1", "secret1").await,
        Err(AccountError::InvalidCredentials)
    ));
    service.authenticate("alice1", "newpass").await.unwrap();
}

#[tokio::test]
async fn admin_resets_password_without_old_one() {
    let (_, service) = setup().await;
    let root = admin(&service).await;
    let bob = register(&service, "bob123", "secret2").await;

    service
        .change_password(&root, bob.id(), password_change("not-it", "reset12"))
        .await
        .unwrap();

    service.authenticate("bob123", "reset12").await.unwrap();
}

#[tokio::test]
async fn update_profile_merges_provided_fields() {
    let (_, service) = setup().await;
    let alice = register(&service, "alice1", "secret1").await;

    let birthday = chrono::NaiveDate::from_ymd_opt(1990, 4, 1).unwrap();
    let profile = service
        .update_profile(
            &alice,
            alice.id(),
            ProfileUpdate {
                last_name: Some("Smith".to_string()),
                gender: Some(Gender::Female),
                birthday: Some(birthday),
                hide_birthday: Some(true),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(profile.first_name, "Test");
    assert_eq!(profile.last_name.as_deref(), Some("Smith"));
    assert_eq!(profile.gender, Gender::Female);
    assert_eq!(profile.birthday, Some(birthday));

    // Hidden from others, visible to the owner
    let public = service.get_profile(alice.id()).await.unwrap();
    assert_eq!(public.birthday, None);
    let own = service.current_profile(&alice).await.unwrap();
    assert_eq!(own.birthday, Some(birthday));

    let err = service
        .update_profile(
            &alice,
            alice.id(),
            ProfileUpdate {
                first_name: Some("   ".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::ValidationFailed(_)));

    // Username and password are untouched
    service.authenticate("alice1", "secret1").await.unwrap();
}

#[tokio::test]
async fn update_profile_is_self_or_admin() {
    let (_, service) = setup().await;
    let root = admin(&service).await;
    let alice = register(&service, "alice1", "secret1").await;
    let bob = register(&service, "bob123", "secret2").await;

    let err = service
        .update_profile(&bob, alice.id(), ProfileUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::Forbidden(_)));

    let profile = service
        .update_profile(
            &root,
            alice.id(),
            ProfileUpdate {
                info: Some("Team captain".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(profile.info.as_deref(), Some("Team captain"));

    let err = service
        .update_profile(&root, AccountId::new(9999), ProfileUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::NotFound(_)));
}

#[tokio::test]
async fn deleted_account_is_gone() {
    let (store, service) = setup().await;
    let alice = register(&service, "alice1", "secret1").await;

    service.delete_account(&alice, alice.id()).await.unwrap();

    assert!(!store.account_exists(alice.id()).await.unwrap());
    assert!(matches!(
        service.get_profile(alice.id()).await,
        Err(AccountError::NotFound(_))
    ));
    assert!(matches!(
        service.authenticate("alice1", "secret1").await,
        Err(AccountError::NotFound(_))
    ));
}

#[tokio::test]
async fn deleting_twice_reports_not_found() {
    let (store, service) = setup().await;
    let root = admin(&service).await;
    let bob = register(&service, "bob123", "secret2").await;

    service.delete_account(&root, bob.id()).await.unwrap();
    let err = service.delete_account(&root, bob.id()).await.unwrap_err();
    assert!(matches!(err, AccountError::NotFound(_)));

    // The store itself stays idempotent
    assert!(!store.delete_account(bob.id()).await.unwrap());
}

#[tokio::test]
async fn non_admin_cannot_delete_others() {
    let (_, service) = setup().await;
    let alice = register(&service, "alice1", "secret1").await;
    let bob = register(&service, "bob123", "secret2").await;

    let err = service.delete_account(&alice, bob.id()).await.unwrap_err();
    assert!(matches!(err, AccountError::Forbidden(_)));
    service.get_profile(bob.id()).await.unwrap();
}

#[tokio::test]
async fn principal_of_deleted_account_fails() {
    let (_, service) = setup().await;
    let root = admin(&service).await;
    let alice = register(&service, "alice1", "secret1").await;

    service.delete_account(&root, alice.id()).await.unwrap();

    let err = service
        .update_profile(&alice, alice.id(), ProfileUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::NotFound(ref m) if m == "account not found"));

    let err = service.current_profile(&alice).await.unwrap_err();
    assert!(matches!(err, AccountError::NotFound(_)));

    assert!(matches!(
        service.resolve_principal(alice.id()).await,
        Err(AccountError::NotFound(_))
    ));
}

#[tokio::test]
async fn blocked_account_cannot_login_or_act() {
    let (_, service) = setup().await;
    let root = admin(&service).await;
    let alice = register(&service, "alice1", "secret1").await;

    let err = service
        .set_enabled(&alice, alice.id(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::Forbidden(_)));

    service.set_enabled(&root, alice.id(), false).await.unwrap();

    assert!(matches!(
        service.authenticate("alice1", "secret1").await,
        Err(AccountError::InvalidCredentials)
    ));
    assert!(matches!(
        service.resolve_principal(alice.id()).await,
        Err(AccountError::InvalidCredentials)
    ));
    assert!(matches!(
        service
            .update_profile(&alice, alice.id(), ProfileUpdate::default())
            .await,
        Err(AccountError::Forbidden(_))
    ));

    service.set_enabled(&root, alice.id(), true).await.unwrap();
    service.authenticate("alice1", "secret1").await.unwrap();
}

#[tokio::test]
async fn grant_role_is_admin_only_and_idempotent() {
    let (_, service) = setup().await;
    let root = admin(&service).await;
    let alice = register(&service, "alice1", "secret1").await;

    let err = service
        .grant_role(&alice, alice.id(), "ADMIN")
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::Forbidden(_)));

    let err = service
        .grant_role(&root, alice.id(), "SUPERUSER")
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::NotFound(_)));

    let roles = service
        .grant_role(&root, alice.id(), "ROLE_ADMIN")
        .await
        .unwrap();
    assert!(roles.contains(&RoleName::Admin));
    assert!(roles.contains(&RoleName::User));

    let again = service.grant_role(&root, alice.id(), "ADMIN").await.unwrap();
    assert_eq!(roles, again);

    // Principals are snapshots; a fresh login sees the new role
    assert!(!alice.roles().contains(&RoleName::Admin));
    let fresh = service.authenticate("alice1", "secret1").await.unwrap();
    assert!(fresh.roles().contains(&RoleName::Admin));
}

#[tokio::test]
async fn bootstrap_admin_promotes_existing_account() {
    let (_, service) = setup().await;
    let existing = register(&service, "root", "rootpass").await;
    assert!(!existing.roles().contains(&RoleName::Admin));

    let root = admin(&service).await;
    assert_eq!(root.id(), existing.id());
    assert!(root.roles().contains(&RoleName::Admin));
}

#[tokio::test]
async fn get_profiles_skips_unknown_ids() {
    let (_, service) = setup().await;
    let alice = register(&service, "alice1", "secret1").await;
    let bob = register(&service, "bob123", "secret2").await;

    let profiles = service
        .get_profiles(&[alice.id(), AccountId::new(4242), bob.id()])
        .await
        .unwrap();
    let names: Vec<_> = profiles.iter().map(|p| p.username.as_str()).collect();
    assert_eq!(names, vec!["alice1", "bob123"]);

    assert_eq!(service.list_profiles().await.unwrap().len(), 2);
    assert!(service.get_profiles(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn login_migrates_outdated_hash() {
    let store = new_store().await;

    let old = service_on(store.clone(), &fast_security()).await;
    let alice = register(&old, "alice1", "secret1").await;
    let before = store
        .find_account_by_id(alice.id())
        .await
        .unwrap()
        .unwrap()
        .password_hash;

    let stronger = SecurityConfig {
        argon2_memory_cost_kib: 128,
        argon2_time_cost: 2,
        ..fast_security()
    };
    let current = service_on(store.clone(), &stronger).await;
    current.authenticate("alice1", "secret1").await.unwrap();

    let after = store
        .find_account_by_id(alice.id())
        .await
        .unwrap()
        .unwrap()
        .password_hash;
    assert_ne!(before, after);
    assert!(after.contains("m=128,t=2,p=1"));

    current.authenticate("alice1", "secret1").await.unwrap();
}

#[tokio::test]
async fn concurrent_registration_on_pooled_file_store() {
    let store = file_store(5).await;
    let service = Arc::new(service_on(store.clone(), &fast_security()).await);

    let racers: Vec<_> = (0..8)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .register(register_request("racer", &format!("secret{i}")))
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    let mut conflicts = 0;
    for racer in racers {
        match racer.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AccountError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected registration error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(store.list_accounts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn block_during_login_hash_migration_sticks() {
    let store = file_store(5).await;
    let fast = service_on(store.clone(), &fast_security()).await;
    let root = admin(&fast).await;
    let alice = register(&fast, "alice1", "secret1").await;

    // Verifying the old digest is quick; re-hashing with these params is not
    let heavy = SecurityConfig {
        argon2_memory_cost_kib: 16384,
        argon2_time_cost: 12,
        ..fast_security()
    };
    let slow = Arc::new(service_on(store.clone(), &heavy).await);
    let login = {
        let slow = slow.clone();
        tokio::spawn(async move { slow.authenticate("alice1", "secret1").await })
    };

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    fast.set_enabled(&root, alice.id(), false).await.unwrap();

    // The login may or may not have passed before the block landed
    let _ = login.await.unwrap();

    let account = store
        .find_account_by_id(alice.id())
        .await
        .unwrap()
        .unwrap();
    assert!(!account.enabled, "login hash migration re-enabled a blocked account");
    assert!(matches!(
        fast.authenticate("alice1", "secret1").await,
        Err(AccountError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn profile_update_keeps_concurrent_block_and_roles() {
    let (store, service) = setup().await;
    let root = admin(&service).await;
    let alice = register(&service, "alice1", "secret1").await;
    let bob = register(&service, "bob123", "secret1").await;

    service
        .grant_role(&root, bob.id(), "ADMIN")
        .await
        .unwrap();
    service.set_enabled(&root, bob.id(), false).await.unwrap();

    service
        .update_profile(
            &root,
            bob.id(),
            ProfileUpdate {
                first_name: Some("Robert".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();
    service
        .change_password(&alice, alice.id(), password_change("secret1", "secret2"))
        .await
        .unwrap();

    let bob_account = store.find_account_by_id(bob.id()).await.unwrap().unwrap();
    assert!(!bob_account.enabled);
    assert!(bob_account.roles.contains(&RoleName::Admin));
    assert_eq!(bob_account.profile.first_name, "Robert");

    let alice_account = store.find_account_by_id(alice.id()).await.unwrap().unwrap();
    assert!(alice_account.enabled);
    assert_eq!(alice_account.roles.len(), 1);
}

#[tokio::test]
async fn grant_role_on_missing_account_is_not_found() {
    let (_store, service) = setup().await;
    let root = admin(&service).await;

    let err = service
        .grant_role(&root, AccountId::new(9999), "ADMIN")
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::NotFound(ref m) if m == "Account 9999 not found"));
}

#[tokio::test]
async fn role_registry_lists_seeded_roles() {
    let store = new_store().await;
    let roles = RoleRegistry::load(&store).await.unwrap();

    let names: Vec<RoleName> = roles.all().map(|role| role.name).collect();
    assert_eq!(names, vec![RoleName::User, RoleName::Admin]);
    assert_eq!(roles.find_by_name("ROLE_ADMIN").unwrap().name, RoleName::Admin);
    assert!(roles.find_by_name("WIZARD").is_err());
}
