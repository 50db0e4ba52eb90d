//! Shell command parsing for the interactive demo

use vizdeck_core::VisualizationTypeId;

/// A parsed line of shell input
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    /// Show the current identity
    Whoami,
    /// Sign in with username and password
    SignIn { username: String, password: String },
    /// Sign out back to a guest identity
    SignOut,
    /// Force a guest identity
    Guest,
    /// List the visualization catalog
    Types,
    /// Load the current identity's setting for a type
    Load { type_id: VisualizationTypeId },
    /// Save a setting for a type
    Save {
        type_id: VisualizationTypeId,
        name: String,
        config: String,
    },
    /// Claim this device's guest records for the signed-in profile
    Claim,
    /// Print the command list
    Help,
    /// Exit the shell
    Quit,
}

impl ShellCommand {
    /// Parse a line of input. Returns `Err` with a usage message on
    /// malformed input; empty lines are `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<ShellCommand>, String> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };

        let command = match verb {
            "whoami" => ShellCommand::Whoami,
            "signin" => {
                let username = parts.next().ok_or("usage: signin <user> <pass>")?;
                let password = parts.next().ok_or("usage: signin <user> <pass>")?;
                ShellCommand::SignIn {
                    username: username.to_string(),
                    password: password.to_string(),
                }
            }
            "signout" => ShellCommand::SignOut,
            "guest" => ShellCommand::Guest,
            "types" => ShellCommand::Types,
            "load" => {
                let type_id = parts.next().ok_or("usage: load <type-id>")?;
                ShellCommand::Load {
                    type_id: VisualizationTypeId::new(type_id),
                }
            }
            "save" => {
                let type_id = parts.next().ok_or("usage: save <type-id> <name> <json>")?;
                let name = parts.next().ok_or("usage: save <type-id> <name> <json>")?;
                // The config blob may contain spaces; take the rest of the line
                let config: String = parts.collect::<Vec<_>>().join(" ");
                if config.is_empty() {
                    return Err("usage: save <type-id> <name> <json>".to_string());
                }
                ShellCommand::Save {
                    type_id: VisualizationTypeId::new(type_id),
                    name: name.to_string(),
                    config,
                }
            }
            "claim" => ShellCommand::Claim,
            "help" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            other => return Err(format!("unknown command: {other} (try 'help')")),
        };
        Ok(Some(command))
    }
}

/// The help text printed by the `help` command
pub const HELP_TEXT: &str = "\
commands:
  whoami                        show the current identity
  signin <user> <pass>          sign in (demo user: demo / password)
  signout                       sign out back to a guest identity
  guest                         continue as guest
  types                         list the visualization catalog
  load <type-id>                load your saved setting for a type
  save <type-id> <name> <json>  save a setting for a type
  claim                         claim this device's guest records
  quit                          exit";

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
