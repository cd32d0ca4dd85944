//! Command-backed tunnel control
//!
//! Drives the kernel WireGuard module through the `wg` and `ip` tools, the
//! same way wg-quick does: create the link, load keys and peers with
//! `wg setconf`, assign addresses, bring the link up.

use crate::config::Settings;
use crate::error::{ConvergeError, Result};
use crate::platform::{CommandRunner, SystemRunner, TunnelControl};
use crate::wireguard::render::{interface_addresses, strip_for_setconf};
use tracing::{debug, info};

/// [`TunnelControl`] implementation shelling out to `wg` and `ip`
pub struct WgCommandControl {
    runner: Box<dyn CommandRunner>,
    wg_binary: String,
    ip_binary: String,
}

impl WgCommandControl {
    /// Create a controller using the binaries named in the settings
    pub fn new(settings: &Settings) -> Self {
        Self::with_runner(settings, Box::new(SystemRunner))
    }

    /// Create a controller with a custom command runner
    pub fn with_runner(settings: &Settings, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            runner,
            wg_binary: settings.wg_binary.clone(),
            ip_binary: settings.ip_binary.clone(),
        }
    }

    /// Execute a command, turning a non-zero exit into an error
    fn run_command(&self, program: &str, args: &[&str], stdin: Option<&str>) -> Result<String> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let output = self.runner.run(program, &args, stdin)?;

        if !output.success {
            return Err(ConvergeError::Command(format!(
                "Command failed: {} {}: {}",
                program,
                args.join(" "),
                output.stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

impl TunnelControl for WgCommandControl {
    fn exists(&self, name: &str) -> Result<bool> {
        // `wg show` exits non-zero for missing and non-WireGuard interfaces alike
        let args = vec!["show".to_string(), name.to_string()];
        let output = self.runner.run(&self.wg_binary, &args, None)?;
        debug!("Interface {} exists: {}", name, output.success);
        Ok(output.success)
    }

    fn apply_config(&self, name: &str, rendered: &str) -> Result<()> {
        let existed = self.exists(name)?;
        if !existed {
            info!("Creating WireGuard interface {}", name);
            self.run_command(
                &self.ip_binary,
                &["link", "add", "dev", name, "type", "wireguard"],
                None,
            )?;
        }

        info!("Loading configuration into {}", name);
        let setconf = strip_for_setconf(rendered);
        self.run_command(
            &self.wg_binary,
            &["setconf", name, "/dev/stdin"],
            Some(setconf.as_str()),
        )?;

        if existed {
            // Addresses dropped from the configuration must not linger
            debug!("Flushing addresses of {}", name);
            self.run_command(&self.ip_binary, &["address", "flush", "dev", name], None)?;
        }

        for address in interface_addresses(rendered) {
            debug!("Assigning address {} to {}", address, name);
            self.run_command(
                &self.ip_binary,
                &["address", "replace", &address, "dev", name],
                None,
            )?;
        }

        self.run_command(&self.ip_binary, &["link", "set", "up", "dev", name], None)?;
        Ok(())
    }

    fn teardown(&self, name: &str) -> Result<()> {
        info!("Deleting WireGuard interface {}", name);
        self.run_command(&self.ip_binary, &["link", "delete", "dev", name], None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::CommandOutput;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every invocation and answers from a fixed script
    #[derive(Clone, Default)]
    struct RecordingRunner {
        calls: Rc<RefCell<Vec<String>>>,
        stdin: Rc<RefCell<Vec<String>>>,
        interface_exists: bool,
        fail_on: Option<&'static str>,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, program: &str, args: &[String], stdin: Option<&str>) -> Result<CommandOutput> {
            let line = format!("{} {}", program, args.join(" "));
            self.calls.borrow_mut().push(line.clone());
            if let Some(input) = stdin {
                self.stdin.borrow_mut().push(input.to_string());
            }

            let success = if line.starts_with("wg show") {
                self.interface_exists
            } else {
                !self.fail_on.is_some_and(|needle| line.contains(needle))
            };

            Ok(CommandOutput {
                success,
                stdout: String::new(),
                stderr: if success { String::new() } else { "boom".to_string() },
            })
        }
    }

    fn control(runner: &RecordingRunner) -> WgCommandControl {
        WgCommandControl::with_runner(&Settings::default(), Box::new(runner.clone()))
    }

    const RENDERED: &str = "[Interface]\n\
        PrivateKey = yAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk=\n\
        ListenPort = 51820\n\
        Address = 10.0.0.1/24 fd00::1/64\n\
        \n\
        [Peer]\n\
        PublicKey = xTIBA5rboUvnH4htodjb6e697QjLERt1NAB4mZqp8Dg=\n\
        AllowedIPs = 10.0.0.2/32\n";

    #[test]
    fn test_exists_maps_exit_status() {
        let present = RecordingRunner {
            interface_exists: true,
            ..Default::default()
        };
        assert!(control(&present).exists("wg0").unwrap());

        let absent = RecordingRunner::default();
        assert!(!control(&absent).exists("wg0").unwrap());
        assert_eq!(absent.calls.borrow()[0], "wg show wg0");
    }

    #[test]
    fn test_apply_creates_missing_interface() {
        let runner = RecordingRunner::default();
        control(&runner).apply_config("wg0", RENDERED).unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(
            *calls,
            vec![
                "wg show wg0",
                "ip link add dev wg0 type wireguard",
                "wg setconf wg0 /dev/stdin",
                "ip address replace 10.0.0.1/24 dev wg0",
                "ip address replace fd00::1/64 dev wg0",
                "ip link set up dev wg0",
            ]
        );

        let stdin = runner.stdin.borrow();
        assert!(!stdin[0].contains("Address"));
        assert!(stdin[0].contains("PrivateKey"));
    }

    #[test]
    fn test_apply_existing_interface_skips_link_add() {
        let runner = RecordingRunner {
            interface_exists: true,
            ..Default::default()
        };
        control(&runner).apply_config("wg0", RENDERED).unwrap();
        assert!(!runner
            .calls
            .borrow()
            .iter()
            .any(|c| c.starts_with("ip link add")));
    }

    #[test]
    fn test_apply_existing_interface_replaces_address_set() {
        let runner = RecordingRunner {
            interface_exists: true,
            ..Default::default()
        };
        let updated = RENDERED.replace("Address = 10.0.0.1/24 fd00::1/64", "Address = 10.9.0.1/24");
        control(&runner).apply_config("wg0", &updated).unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(
            *calls,
            vec![
                "wg show wg0",
                "wg setconf wg0 /dev/stdin",
                "ip address flush dev wg0",
                "ip address replace 10.9.0.1/24 dev wg0",
                "ip link set up dev wg0",
            ]
        );
    }

    #[test]
    fn test_apply_new_interface_does_not_flush() {
        let runner = RecordingRunner::default();
        control(&runner).apply_config("wg0", RENDERED).unwrap();
        assert!(!runner
            .calls
            .borrow()
            .iter()
            .any(|c| c.contains("flush")));
    }

    #[test]
    fn test_apply_stops_at_first_failure() {
        let runner = RecordingRunner {
            fail_on: Some("setconf"),
            ..Default::default()
        };
        let err = control(&runner).apply_config("wg0", RENDERED).unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(!runner
            .calls
            .borrow()
            .iter()
            .any(|c| c.starts_with("ip address")));
    }

    #[test]
    fn test_teardown() {
        let runner = RecordingRunner::default();
        control(&runner).teardown("wg0").unwrap();
        assert_eq!(runner.calls.borrow()[0], "ip link delete dev wg0");

        let failing = RecordingRunner {
            fail_on: Some("delete"),
            ..Default::default()
        };
        assert!(control(&failing).teardown("wg0").is_err());
    }
}
