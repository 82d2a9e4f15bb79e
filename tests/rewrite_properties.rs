//! Property tests for the URL rewrite policy and base URL resolution.

use proptest::prelude::*;

use airlift::core::types::GitServerInfo;
use airlift::gitserver::{resolve_base_url, rewrite_url, InternalEndpoint};

const USER: &str = "airlift-git-user";

fn hosts() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["github.com", "gitlab.com", "code.example.io"])
}

fn schemes() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["https", "http"])
}

proptest! {
    #[test]
    fn rewrite_is_idempotent(
        owner in "[a-z][a-z0-9]{0,10}",
        name in "[a-z][a-z0-9]{0,10}",
        host in hosts(),
        scheme in schemes(),
    ) {
        let base = "http://127.0.0.1:9000";
        let url = format!("{scheme}://{host}/{owner}/{name}.git");

        let once = rewrite_url(base, &url, USER);
        let twice = rewrite_url(base, &once, USER);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn rewrite_preserves_identity_across_hosts_and_schemes(
        owner in "[a-z][a-z0-9]{0,10}",
        name in "[a-z][a-z0-9]{0,10}",
        host_a in hosts(),
        host_b in hosts(),
        scheme in schemes(),
    ) {
        let base = "http://127.0.0.1:9000";

        let from_a = rewrite_url(base, &format!("{scheme}://{host_a}/{owner}/{name}.git"), USER);
        let from_b = rewrite_url(base, &format!("https://{host_b}/{owner}/{name}"), USER);
        let from_scp = rewrite_url(base, &format!("git@{host_a}:{owner}/{name}.git"), USER);

        prop_assert_eq!(&from_a, &from_b);
        prop_assert_eq!(&from_a, &from_scp);
    }

    #[test]
    fn external_server_without_port_resolves_to_its_address(
        address in "https://[a-z][a-z0-9]{0,10}\\.example\\.com",
    ) {
        let info = GitServerInfo {
            internal_server: false,
            git_address: address.clone(),
            git_port: 0,
            ..Default::default()
        };
        prop_assert_eq!(resolve_base_url(&info, InternalEndpoint::ClusterService), address);
    }

    #[test]
    fn external_server_with_port_appends_it(
        address in "https://[a-z][a-z0-9]{0,10}\\.example\\.com",
        port in 1u16..,
    ) {
        let info = GitServerInfo {
            internal_server: false,
            git_address: address.clone(),
            git_port: port,
            ..Default::default()
        };
        prop_assert_eq!(
            resolve_base_url(&info, InternalEndpoint::ClusterService),
            format!("{address}:{port}")
        );
    }
}
