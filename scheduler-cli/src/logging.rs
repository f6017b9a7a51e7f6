use anyhow::{Context, Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

const OWN_TARGETS: [&str; 2] = ["scheduler_client", "scheduler_cli"];
const TRANSPORT_TARGETS: [&str; 2] = ["hyper_util", "reqwest"];

/// Директива фильтра: базовый уровень из настроек; `--verbose` поднимает
/// наши крейты до `debug`, HTTP-стек при этом остаётся на `warn`.
fn filter_directive(base_level: &str, verbose: bool) -> String {
    if !verbose {
        return base_level.to_string();
    }

    let mut directives = vec![base_level.to_string()];
    directives.extend(OWN_TARGETS.iter().map(|target| format!("{target}=debug")));
    directives.extend(TRANSPORT_TARGETS.iter().map(|target| format!("{target}=warn")));
    directives.join(",")
}

/// Логи идут в stderr, чтобы не смешиваться с выводом команд.
pub fn init_logging(base_level: &str, verbose: bool) -> Result<()> {
    let directive = filter_directive(base_level, verbose);
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter `{directive}`"))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time()
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_run_uses_configured_level() {
        assert_eq!(filter_directive("warn", false), "warn");
        assert_eq!(
            filter_directive("info,scheduler_client=trace", false),
            "info,scheduler_client=trace"
        );
    }

    #[test]
    fn verbose_raises_own_crates_only() {
        assert_eq!(
            filter_directive("warn", true),
            "warn,scheduler_client=debug,scheduler_cli=debug,hyper_util=warn,reqwest=warn"
        );
    }

    #[test]
    fn built_directives_parse() {
        for verbose in [false, true] {
            let directive = filter_directive("info", verbose);
            assert!(EnvFilter::try_new(&directive).is_ok(), "{directive}");
        }
    }
}
