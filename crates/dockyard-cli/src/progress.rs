use crate::style::{BOLD, CHECK, DIM, DOT, GREEN, PACKAGE, WARN, YELLOW};
use console::Term;
use dockyard_engine::{Action, ApplyEvent, EntityKind, ProgressSink};

/// Renders engine progress as one line per event on stdout.
pub struct ConsoleProgress {
    term: Term,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    fn line(event: ApplyEvent) -> String {
        match event {
            ApplyEvent::Phase(kind) => {
                let heading = match kind {
                    EntityKind::Network => "Checking network",
                    EntityKind::Proxy => "Checking proxy",
                    EntityKind::Database => "Checking databases",
                    EntityKind::Service => "Checking services",
                    EntityKind::Site => "Checking sites",
                };
                format!("{}", BOLD.apply_to(heading))
            }
            // Too chatty to print every lookup.
            ApplyEvent::Step {
                action: Action::Checking,
                ..
            } => String::new(),
            ApplyEvent::Step { name, action, .. } => {
                let icon = if action == Action::Pulling { PACKAGE } else { DOT };
                format!("  {icon} {} {name}", DIM.apply_to(action.as_str()))
            }
            ApplyEvent::Ready { name, .. } => format!("  {CHECK} {}", GREEN.apply_to(name)),
            ApplyEvent::Warning { name, message } => {
                format!("  {WARN} {}", YELLOW.apply_to(format!("{name}: {message}")))
            }
            ApplyEvent::RoutingApplied { entries } => format!(
                "{} {}",
                BOLD.apply_to("Proxy configured"),
                DIM.apply_to(format!("({entries} hostnames)"))
            ),
            ApplyEvent::HostsSkipped => format!("{}", DIM.apply_to("Skipping the hosts file")),
            ApplyEvent::HostsRegistered { count } => format!(
                "{} {}",
                BOLD.apply_to("Hosts file updated"),
                DIM.apply_to(format!("({count} hostnames)"))
            ),
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn emit(&self, event: ApplyEvent) {
        let line = Self::line(event);
        if !line.is_empty() {
            let _ = self.term.write_line(&line);
        }
    }
}
