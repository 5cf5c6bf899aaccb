//! Property test: no sequence of membership and role changes leaves an
//! account without an owner.

mod common;

use custos_core::models::group::CreateGroup;
use custos_db::MemStore;
use custos_iam::defaults::OWNER_ROLE;
use custos_iam::{DeregistrationService, OwnershipProcessor, RegistrationService};
use proptest::prelude::*;
use uuid::Uuid;

use common::{acting, create_user, join, owned_account, role, stack};

const USERS: usize = 4;
const GROUPS: usize = 2;

#[derive(Debug, Clone)]
enum Op {
    GrantOwner(usize),
    RevokeOwner(usize),
    JoinGroup(usize, usize),
    LeaveGroup(usize, usize),
    GrantOwnerToGroup(usize),
    RevokeOwnerFromGroup(usize),
    DeleteGroup(usize),
    LeaveAccount(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let user = 0..USERS;
    let group = 0..GROUPS;
    prop_oneof![
        user.clone().prop_map(Op::GrantOwner),
        user.clone().prop_map(Op::RevokeOwner),
        (user.clone(), group.clone()).prop_map(|(u, g)| Op::JoinGroup(u, g)),
        (user.clone(), group.clone()).prop_map(|(u, g)| Op::LeaveGroup(u, g)),
        group.clone().prop_map(Op::GrantOwnerToGroup),
        group.clone().prop_map(Op::RevokeOwnerFromGroup),
        group.prop_map(Op::DeleteGroup),
        user.prop_map(Op::LeaveAccount),
    ]
}

/// Applies `ops` in order, each performed by a current owner, and returns
/// the owner count after every step. Rejected operations are expected.
async fn owner_counts(ops: Vec<Op>) -> Vec<usize> {
    let store = MemStore::default();
    let stack = stack(&store);
    let (u0, acme, ctx) = owned_account(&store, &stack, "u0", "Acme").await;
    let owner_role = role(&store, acme.id, OWNER_ROLE).await.id;

    let mut users: Vec<Uuid> = vec![u0.id];
    for i in 1..USERS {
        let user = create_user(&store, &format!("u{i}")).await;
        join(&store, acme.id, user.id).await;
        users.push(user.id);
    }
    let mut groups = Vec::new();
    for i in 0..GROUPS {
        let group = stack
            .registration
            .register_group(
                &ctx,
                CreateGroup {
                    name: format!("g{i}"),
                    description: String::new(),
                },
            )
            .await
            .unwrap();
        groups.push(group.id);
    }

    let ownership = OwnershipProcessor::new(store.clone());
    let registration = &stack.registration;
    let deregistration = &stack.deregistration;
    let mut counts = Vec::with_capacity(ops.len());

    for op in ops {
        let owners = ownership.account_owners(acme.id).await.unwrap();
        let Some(&actor) = owners.iter().next() else {
            break;
        };
        let ctx = acting(actor, acme.id);

        let _ = match op {
            Op::GrantOwner(u) => registration
                .register_roles_to_user(&ctx, users[u], vec![owner_role])
                .await
                .map(drop),
            Op::RevokeOwner(u) => deregistration
                .deregister_roles_from_user(&ctx, users[u], vec![owner_role])
                .await
                .map(drop),
            Op::JoinGroup(u, g) => registration
                .register_users_to_group(&ctx, groups[g], vec![users[u]])
                .await
                .map(drop),
            Op::LeaveGroup(u, g) => deregistration
                .deregister_users_from_group(&ctx, groups[g], vec![users[u]])
                .await
                .map(drop),
            Op::GrantOwnerToGroup(g) => registration
                .register_roles_to_group(&ctx, groups[g], vec![owner_role])
                .await
                .map(drop),
            Op::RevokeOwnerFromGroup(g) => deregistration
                .deregister_roles_from_group(&ctx, groups[g], vec![owner_role])
                .await
                .map(drop),
            Op::DeleteGroup(g) => deregistration.deregister_group(&ctx, groups[g]).await,
            Op::LeaveAccount(u) => {
                deregistration
                    .deregister_user_from_account(&ctx, users[u])
                    .await
            }
        };

        counts.push(ownership.account_owners(acme.id).await.unwrap().len());
    }
    counts
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    #[test]
    fn accounts_always_keep_an_owner(ops in prop::collection::vec(op(), 1..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let steps = ops.len();
        let counts = runtime.block_on(owner_counts(ops));

        prop_assert_eq!(counts.len(), steps);
        prop_assert!(counts.iter().all(|&n| n > 0), "owner counts: {:?}", counts);
    }
}
