//! End-to-end reconciliation through the command-backed tunnel control
//!
//! The `wg` and `ip` invocations are captured by a scripted runner instead of
//! being executed, so these tests run without root.

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use wg_converge::config::{ConvergeRequest, Settings};
use wg_converge::platform::{CommandOutput, CommandRunner, WgCommandControl};
use wg_converge::reconcile::{Action, Reconciler};
use wg_converge::storage::LocalFileStore;
use wg_converge::wireguard::OsKeyGenerator;

#[derive(Default)]
struct Script {
    link_up: bool,
    calls: Vec<String>,
    stdin: Vec<String>,
}

#[derive(Clone, Default)]
struct ScriptedRunner {
    script: Rc<RefCell<Script>>,
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> wg_converge::Result<CommandOutput> {
        let mut script = self.script.borrow_mut();
        let line = format!("{} {}", program, args.join(" "));
        if let Some(input) = stdin {
            script.stdin.push(input.to_string());
        }

        let success = if line.contains("wg show") {
            script.link_up
        } else {
            if line.contains("link add") {
                script.link_up = true;
            } else if line.contains("link delete") {
                script.link_up = false;
            }
            true
        };
        script.calls.push(line);

        Ok(CommandOutput {
            success,
            stdout: String::new(),
            stderr: if success {
                String::new()
            } else {
                "Unable to access interface: No such device".to_string()
            },
        })
    }
}

fn request(state: &str) -> wg_converge::reconcile::ReconcileRequest {
    request_with_addresses(state, r#""10.7.0.1/24", "fd07::1/64""#)
}

fn request_with_addresses(state: &str, addresses: &str) -> wg_converge::reconcile::ReconcileRequest {
    let json = format!(
        r#"{{
            "name": "wg7",
            "listenPort": 51900,
            "addresses": [{}],
            "peers": [{{
                "publicKey": "xTIBA5rboUvnH4htodjb6e697QjLERt1NAB4mZqp8Dg=",
                "allowedIPs": ["10.7.0.2/32"],
                "endpoint": {{"address": "vpn.example.com", "port": 51820}}
            }}],
            "state": "{}"
        }}"#,
        addresses, state
    );
    ConvergeRequest::from_json(&json)
        .unwrap()
        .into_request()
        .unwrap()
}

#[test]
fn test_create_then_delete_via_commands() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        config_dir: dir.path().to_path_buf(),
        wg_binary: "/usr/bin/wg".to_string(),
        ..Settings::default()
    };
    let runner = ScriptedRunner::default();
    let reconciler = Reconciler::new(
        Box::new(WgCommandControl::with_runner(&settings, Box::new(runner.clone()))),
        Box::new(OsKeyGenerator),
        Box::new(LocalFileStore),
        settings.clone(),
    );

    let created = reconciler.reconcile(&request("present"));
    assert_eq!(created.action, Action::Create);
    assert!(!created.failed, "{:?}", created.error);

    {
        let script = runner.script.borrow();
        assert!(script.calls.contains(&"ip link add dev wg7 type wireguard".to_string()));
        assert!(script.calls.contains(&"/usr/bin/wg setconf wg7 /dev/stdin".to_string()));
        assert!(script
            .calls
            .contains(&"ip address replace fd07::1/64 dev wg7".to_string()));
        assert_eq!(script.calls.last().map(String::as_str), Some("ip link set up dev wg7"));

        // wg setconf does not understand wg-quick's Address key
        assert_eq!(script.stdin.len(), 1);
        assert!(!script.stdin[0].contains("Address"));
        assert!(script.stdin[0].contains("Endpoint = vpn.example.com:51820"));
    }

    let persisted = fs::read_to_string(settings.config_path("wg7")).unwrap();
    assert!(persisted.contains("Address = 10.7.0.1/24 fd07::1/64\n"));

    let unchanged = reconciler.reconcile(&request("present"));
    assert_eq!(unchanged.action, Action::None);

    let deleted = reconciler.reconcile(&request("absent"));
    assert_eq!(deleted.action, Action::Delete);
    assert!(!settings.config_path("wg7").exists());
    assert_eq!(
        runner.script.borrow().calls.last().map(String::as_str),
        Some("ip link delete dev wg7")
    );
}

#[test]
fn test_update_drops_removed_addresses() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        config_dir: dir.path().to_path_buf(),
        ..Settings::default()
    };
    let runner = ScriptedRunner::default();
    let reconciler = Reconciler::new(
        Box::new(WgCommandControl::with_runner(&settings, Box::new(runner.clone()))),
        Box::new(OsKeyGenerator),
        Box::new(LocalFileStore),
        settings,
    );

    reconciler.reconcile(&request("present"));
    runner.script.borrow_mut().calls.clear();

    let updated = reconciler.reconcile(&request_with_addresses("present", r#""10.9.0.1/24""#));
    assert_eq!(updated.action, Action::Update);
    assert!(!updated.failed, "{:?}", updated.error);

    let script = runner.script.borrow();
    let addressing: Vec<&str> = script
        .calls
        .iter()
        .map(String::as_str)
        .filter(|c| c.starts_with("ip address"))
        .collect();
    assert_eq!(
        addressing,
        vec!["ip address flush dev wg7", "ip address replace 10.9.0.1/24 dev wg7"]
    );
}
