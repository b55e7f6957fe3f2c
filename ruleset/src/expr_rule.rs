//! Named expressions evaluated by a host against one address at a time.
//!
//! Each rule is a rhai expression over the variable `ip`, usually calling
//! `example::ip_belongs_to_network`. This is how a host uses the builtin from
//! stored queries; the rules add no membership semantics of their own.

use crate::error::{
    CompileSnafu, EvaluateSnafu, NotBooleanSnafu, ParseRulesSnafu, ReadRulesSnafu, RuleError,
};
use crate::{MatchResult, Ruleset};
use rhai::{Dynamic, Scope, AST};
use serde::Deserialize;
use snafu::{OptionExt, ResultExt};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExprRule {
    pub name: String,
    #[serde(default)]
    pub log: bool,
    pub expr: String,
}

pub async fn read_expr_rules_from_file(path: &str) -> Result<Vec<ExprRule>, RuleError> {
    let mut file = File::open(path).await.context(ReadRulesSnafu { path })?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .await
        .context(ReadRulesSnafu { path })?;
    read_expr_rules_from_str(&contents)
}

pub fn read_expr_rules_from_str(yaml_str: &str) -> Result<Vec<ExprRule>, RuleError> {
    serde_yaml::from_str(yaml_str).context(ParseRulesSnafu)
}

#[derive(Debug)]
struct CompiledExprRule {
    name: String,
    log: bool,
    ast: AST,
}

/// Rules compiled against an engine with the builtins registered.
///
/// Rules are checked in order; the first one that evaluates to `true` is reported.
#[derive(Debug)]
pub struct ExprRuleset {
    rules: Vec<CompiledExprRule>,
    engine: Arc<rhai::Engine>,
}

impl ExprRuleset {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

pub fn compile_expr_rules(
    rules: Vec<ExprRule>,
    engine: Arc<rhai::Engine>,
) -> Result<ExprRuleset, RuleError> {
    let rules = rules
        .into_iter()
        .map(|rule| -> Result<CompiledExprRule, RuleError> {
            let ast = engine
                .compile_expression(&rule.expr)
                .context(CompileSnafu { name: &rule.name })?;
            Ok(CompiledExprRule {
                name: rule.name,
                log: rule.log,
                ast,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!(rules = rules.len(), "compiled expression rules");
    Ok(ExprRuleset { rules, engine })
}

impl Ruleset for ExprRuleset {
    fn matches(&self, ip: &str) -> Result<MatchResult, RuleError> {
        for rule in &self.rules {
            let mut scope = Scope::new();
            scope.push_constant("ip", ip.to_string());
            let value: Dynamic = self
                .engine
                .eval_ast_with_scope(&mut scope, &rule.ast)
                .context(EvaluateSnafu { name: &rule.name })?;
            let matched = value.as_bool().ok().context(NotBooleanSnafu {
                name: &rule.name,
                type_name: value.type_name(),
            })?;
            if matched {
                if rule.log {
                    info!(rule = %rule.name, ip, "rule matched");
                }
                return Ok(MatchResult {
                    rule: Some(rule.name.clone()),
                });
            }
        }
        Ok(MatchResult { rule: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    fn ruleset(yaml_str: &str) -> ExprRuleset {
        let rules = read_expr_rules_from_str(yaml_str).unwrap();
        compile_expr_rules(rules, Arc::new(Engine::default().register())).unwrap()
    }

    #[tokio::test]
    async fn test_read_expr_rules_from_file() {
        let rules = read_expr_rules_from_file("../rules.yaml").await.unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].name, "office");
        assert!(rules[1].log);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let err = read_expr_rules_from_file("../no-such-rules.yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, RuleError::ReadRules { .. }));
    }

    #[test]
    fn test_first_match_is_reported() {
        let rs = ruleset(
            r#"
            - name: office
              expr: 'example::ip_belongs_to_network(ip, "10.10.0.0/16")'
            - name: private
              log: true
              expr: 'example::ip_belongs_to_network(ip, "10.0.0.0/8")'
            "#,
        );
        assert_eq!(rs.len(), 2);
        assert_eq!(
            rs.matches("10.10.3.4").unwrap(),
            MatchResult {
                rule: Some("office".to_string())
            }
        );
        assert_eq!(
            rs.matches("10.200.0.1").unwrap().rule.as_deref(),
            Some("private")
        );
        assert_eq!(rs.matches("8.8.8.8").unwrap(), MatchResult { rule: None });
    }

    #[test]
    fn test_invalid_ip_fails_the_rule() {
        let rs = ruleset(
            r#"
            - name: private
              expr: 'example::ip_belongs_to_network(ip, "10.0.0.0/8")'
            "#,
        );
        let err = rs.matches("invalid_ip").unwrap_err();
        assert!(matches!(err, RuleError::Evaluate { .. }));
        assert!(err
            .to_string()
            .starts_with("Failed to evaluate rule 'private': Invalid IP or network format: "));
    }

    #[test]
    fn test_non_boolean_rule() {
        let rs = ruleset(
            r#"
            - name: answer
              expr: '42'
            "#,
        );
        let err = rs.matches("10.0.0.1").unwrap_err();
        assert!(matches!(err, RuleError::NotBoolean { .. }));
    }

    #[test]
    fn test_compile_error_names_rule() {
        let rules = read_expr_rules_from_str(
            r#"
            - name: broken
              expr: 'example::ip_belongs_to_network(ip,'
            "#,
        )
        .unwrap();
        let err = compile_expr_rules(rules, Arc::new(Engine::default().register())).unwrap_err();
        assert!(matches!(err, RuleError::Compile { ref name, .. } if name == "broken"));
    }

    #[test]
    fn test_unknown_field() {
        let err = read_expr_rules_from_str(
            r#"
            - name: odd
              action: block
              expr: 'true'
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::ParseRules { .. }));
    }
}
