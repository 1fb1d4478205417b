//! CLI argument parsing and help text for ImagePilot.

/// Print general usage information.
pub fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "ImagePilot - policy-driven image update controller v{}

USAGE:
    imagepilot [COMMAND] [OPTIONS]

COMMANDS:
    serve        Run the controller, reading JSON events from stdin (default)
    check        Evaluate one policy against a current and a new tag
    labels       Resolve the policy configured by deployment labels
    version      Show version information
    help         Show this help message

EXAMPLES:
    imagepilot serve < events.jsonl
    imagepilot check --policy minor --current 1.2.3 --new 1.3.0
    imagepilot check --policy force --match-tag --current latest --new latest
    imagepilot labels imagepilot.sh/policy=glob:1.2.*

ENVIRONMENT:
    IMAGEPILOT_CONFIG            Path to a TOML config file
    IMAGEPILOT_QUEUE_CAPACITY    Event queue size (default 100)
    IMAGEPILOT_LOG_FORMAT        pretty or json
    IMAGEPILOT_CLUSTER_MANIFEST  JSON manifest seeding the in-memory cluster
    RUST_LOG                     Log filter (debug, info, warn, error)

EXIT CODES:
    0  Success / update recommended
    1  Failure / no update
    2  Configuration or usage error
",
        version
    );
}

/// Print detailed help for a specific command.
pub fn print_command_help(command: &str) {
    match command {
        "serve" => eprintln!(
            "imagepilot serve

Starts the controller against the cluster manifest named by
IMAGEPILOT_CLUSTER_MANIFEST and reads one JSON event per line from stdin:

    {{\"repositoryName\":\"team/api\",\"tag\":\"1.4.0\",\"registryHost\":\"quay.io\"}}

On end of input the queue is drained and the resulting manifest is printed
to stdout. Ctrl-C stops immediately and drops queued events."
        ),
        "check" => eprintln!(
            "imagepilot check --policy <NAME> --current <TAG> --new <TAG> [--match-tag]

Exits 0 when the policy recommends the update, 1 when it does not, and 2
when the tags cannot be evaluated."
        ),
        "labels" => eprintln!(
            "imagepilot labels <KEY=VALUE>...

Resolves the policy a deployment with these labels would get."
        ),
        _ => eprintln!(
            "No detailed help available for '{}'. Use 'imagepilot help' for general usage.",
            command
        ),
    }
}

/// Value following `flag`, if present.
pub fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Parse `key=value` arguments into a label map.
pub fn parse_labels(args: &[String]) -> Result<std::collections::BTreeMap<String, String>, String> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", arg))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags() {
        let a = args(&["imagepilot", "check", "--policy", "minor", "--match-tag"]);
        assert_eq!(flag_value(&a, "--policy"), Some("minor"));
        assert_eq!(flag_value(&a, "--new"), None);
        assert_eq!(flag_value(&a, "--match-tag"), None);
        assert!(has_flag(&a, "--match-tag"));
    }

    #[test]
    fn labels() {
        let parsed = parse_labels(&args(&["imagepilot.sh/policy=glob:1.*", "app=web"])).unwrap();
        assert_eq!(parsed["imagepilot.sh/policy"], "glob:1.*");
        assert_eq!(parsed["app"], "web");
        assert!(parse_labels(&args(&["novalue"])).is_err());
    }
}
