//! Subcommand implementations. Each returns the text printed on stdout.

use nm_ruleset::engine::{error_message, functions, FunctionInfo};
use nm_ruleset::{ip_belongs_to_network, MatchResult, RuleError, Ruleset, ValidationError};
use rhai::{Dynamic, EvalAltResult};
use serde::Serialize;
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CommandError {
    #[snafu(display("{}", source))]
    Check { source: ValidationError },

    #[snafu(display("{}", error_message(source)))]
    Eval { source: Box<EvalAltResult> },

    #[snafu(display("{}", source))]
    Rules { source: RuleError },

    #[snafu(display("failed to encode JSON: {}", source))]
    Json { source: serde_json::Error },
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    ip: &'a str,
    network: &'a str,
    result: bool,
}

#[derive(Serialize)]
struct MatchOutput<'a> {
    ip: &'a str,
    #[serde(flatten)]
    result: MatchResult,
}

pub fn check(ip: &str, network: &str, json: bool) -> Result<String, CommandError> {
    let result = ip_belongs_to_network(ip, network).context(CheckSnafu)?;
    if json {
        serde_json::to_string(&CheckOutput {
            ip,
            network,
            result,
        })
        .context(JsonSnafu)
    } else {
        Ok(result.to_string())
    }
}

pub fn eval(engine: &rhai::Engine, expr: &str, json: bool) -> Result<String, CommandError> {
    let value: Dynamic = engine.eval_expression(expr).context(EvalSnafu)?;
    if json {
        serde_json::to_string(&value).context(JsonSnafu)
    } else {
        Ok(value.to_string())
    }
}

pub fn match_ips(
    ruleset: &dyn Ruleset,
    ips: &[String],
    json: bool,
) -> Result<String, CommandError> {
    let mut lines = Vec::with_capacity(ips.len());
    for ip in ips {
        let result = ruleset.matches(ip).context(RulesSnafu)?;
        let line = if json {
            serde_json::to_string(&MatchOutput { ip, result }).context(JsonSnafu)?
        } else {
            format!("{}\t{}", ip, result.rule.as_deref().unwrap_or("-"))
        };
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

pub fn list_functions(json: bool) -> Result<String, CommandError> {
    let infos: &[FunctionInfo] = functions();
    if json {
        serde_json::to_string(infos).context(JsonSnafu)
    } else {
        Ok(infos
            .iter()
            .map(|info| format!("{} - {}", info.signature(), info.description))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nm_ruleset::engine::Engine;
    use nm_ruleset::expr_rule::{compile_expr_rules, read_expr_rules_from_str};
    use std::sync::Arc;

    #[test]
    fn test_check() {
        assert_eq!(check("10.10.0.12", "10.10.0.0/8", false).unwrap(), "true");
        assert_eq!(check("192.168.1.10", "10.10.0.0/8", false).unwrap(), "false");
        assert_eq!(
            check("10.10.10.1", "10.10.0.0/16", true).unwrap(),
            r#"{"ip":"10.10.10.1","network":"10.10.0.0/16","result":true}"#
        );

        let err = check("10.10.0.12", "invalid_network", false).unwrap_err();
        assert!(err.to_string().starts_with("Invalid IP or network format"));
    }

    #[test]
    fn test_eval() {
        let engine = Engine::default().register();
        assert_eq!(
            eval(
                &engine,
                r#"example::ip_belongs_to_network("10.10.10.1", "10.10.0.0/23")"#,
                false
            )
            .unwrap(),
            "false"
        );
        let err = eval(
            &engine,
            r#"example::ip_belongs_to_network("", "10.10.0.0/8")"#,
            false,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid IP or network format: ip must not be null or empty"
        );

        let err = eval(
            &engine,
            r#"example::ip_belongs_to_network("invalid_ip", "10.10.0.0/8")"#,
            false,
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Invalid IP or network format: invalid IP address 'invalid_ip'"));
    }

    #[test]
    fn test_match_ips() {
        let rules = read_expr_rules_from_str(
            r#"
            - name: private
              expr: 'example::ip_belongs_to_network(ip, "10.0.0.0/8")'
            "#,
        )
        .unwrap();
        let rs = compile_expr_rules(rules, Arc::new(Engine::default().register())).unwrap();
        let ips = vec!["10.1.2.3".to_string(), "8.8.8.8".to_string()];
        assert_eq!(
            match_ips(&rs, &ips, false).unwrap(),
            "10.1.2.3\tprivate\n8.8.8.8\t-"
        );
        assert_eq!(
            match_ips(&rs, &ips[..1], true).unwrap(),
            r#"{"ip":"10.1.2.3","rule":"private"}"#
        );
    }

    #[test]
    fn test_list_functions() {
        let text = list_functions(false).unwrap();
        assert!(text.starts_with("example::ip_belongs_to_network(ip, network) - "));
    }
}
