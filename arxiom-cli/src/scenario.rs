//! Scripted registry sessions
//!
//! A scenario is a JSON document with an ordered list of steps, each acting
//! as some identity against a fresh in-memory registry node. Amounts are
//! human-readable and scaled by the configured token decimals.

use anyhow::{Context, Result};
use arxiom_registry::{
    token_ledger::InMemoryTokenLedger, units, Identity, Problem, ProblemId, RegistryConfig,
    RegistryNode, Solution, TokenAmount,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Mint {
        identity: String,
        amount: String,
    },
    Approve {
        caller: String,
        amount: String,
    },
    Post {
        caller: String,
        metadata: String,
        bounty: String,
    },
    Submit {
        caller: String,
        problem_id: ProblemId,
        solution: String,
    },
    Select {
        caller: String,
        problem_id: ProblemId,
        index: usize,
    },
    Show {
        problem_id: ProblemId,
    },
    Balance {
        identity: String,
    },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub accepted: usize,
    pub rejected: usize,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse scenario")
    }
}

/// Problem as printed by the `show` step
#[derive(Serialize)]
struct ProblemView<'a> {
    problem: &'a Problem,
    bounty: String,
    solutions: &'a [Solution],
}

struct Session {
    node: RegistryNode,
    ledger: std::sync::Arc<InMemoryTokenLedger>,
    decimals: u32,
}

impl Session {
    fn amount(&self, amount: &str) -> Result<TokenAmount> {
        Ok(units::parse_units(amount, self.decimals)?)
    }

    fn display(&self, amount: TokenAmount) -> Result<String> {
        Ok(units::format_units(amount, self.decimals)?)
    }

    async fn execute(&self, step: &Step) -> Result<String> {
        match step {
            Step::Mint { identity, amount } => {
                let amount = self.amount(amount)?;
                self.ledger.mint(&Identity::from(identity.as_str()), amount).await?;
                Ok(format!("minted {} to {}", self.display(amount)?, identity))
            }
            Step::Approve { caller, amount } => {
                let amount = self.amount(amount)?;
                self.node
                    .client(caller.as_str())
                    .approve_registry(amount)
                    .await?;
                Ok(format!("{} approved registry for {}", caller, self.display(amount)?))
            }
            Step::Post {
                caller,
                metadata,
                bounty,
            } => {
                let bounty = self.amount(bounty)?;
                let problem_id = self
                    .node
                    .client(caller.as_str())
                    .post_problem(metadata, bounty)
                    .await?;
                Ok(format!("{} posted problem {}", caller, problem_id))
            }
            Step::Submit {
                caller,
                problem_id,
                solution,
            } => {
                let index = self
                    .node
                    .client(caller.as_str())
                    .submit_solution(*problem_id, solution)
                    .await?;
                Ok(format!(
                    "{} submitted solution {} to problem {}",
                    caller, index, problem_id
                ))
            }
            Step::Select {
                caller,
                problem_id,
                index,
            } => {
                let winner = self
                    .node
                    .client(caller.as_str())
                    .select_winner(*problem_id, *index)
                    .await?;
                Ok(format!("problem {} awarded to {}", problem_id, winner))
            }
            Step::Show { problem_id } => {
                let problem = self.node.get_problem(*problem_id).await?;
                let solutions = self.node.list_solutions(*problem_id).await?;
                let view = ProblemView {
                    bounty: self.display(problem.bounty_amount)?,
                    problem: &problem,
                    solutions: &solutions,
                };
                Ok(serde_json::to_string(&view)?)
            }
            Step::Balance { identity } => {
                let balance = self.node.balance_of(&Identity::from(identity.as_str())).await?;
                Ok(format!("{} holds {}", identity, self.display(balance)?))
            }
        }
    }
}

/// Execute every step, printing each outcome and then the event log
pub async fn run(config: RegistryConfig, scenario: &Scenario, fail_fast: bool) -> Result<Report> {
    let decimals = config.token.decimals;
    let (node, ledger) = RegistryNode::in_memory(config).await?;
    let session = Session {
        node,
        ledger,
        decimals,
    };

    info!("Running scenario with {} steps", scenario.steps.len());

    let mut report = Report::default();
    for (i, step) in scenario.steps.iter().enumerate() {
        match session.execute(step).await {
            Ok(outcome) => {
                report.accepted += 1;
                println!("[{}] ok: {}", i, outcome);
            }
            Err(e) => {
                report.rejected += 1;
                warn!("Step {} rejected: {:#}", i, e);
                println!("[{}] rejected: {:#}", i, e);
                if fail_fast {
                    break;
                }
            }
        }
    }

    for record in session.node.events().await {
        println!("{}", serde_json::to_string(&record)?);
    }

    println!(
        "{} accepted, {} rejected, custody {}",
        report.accepted,
        report.rejected,
        session.display(session.node.custody_balance().await?)?
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "steps": [
            { "action": "mint", "identity": "researcher", "amount": "1000" },
            { "action": "approve", "caller": "researcher", "amount": "100" },
            { "action": "post", "caller": "researcher", "metadata": "QmProblem", "bounty": "100" },
            { "action": "submit", "caller": "alice", "problem_id": 1, "solution": "QmA" },
            { "action": "submit", "caller": "bob", "problem_id": 1, "solution": "QmB" },
            { "action": "select", "caller": "researcher", "problem_id": 1, "index": 1 },
            { "action": "submit", "caller": "carol", "problem_id": 1, "solution": "QmC" },
            { "action": "balance", "identity": "bob" }
        ]
    }"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        assert_eq!(scenario.steps.len(), 8);
        assert!(matches!(
            scenario.steps[5],
            Step::Select {
                problem_id: 1,
                index: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_run_counts_rejections() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();

        let report = run(RegistryConfig::default(), &scenario, false).await.unwrap();

        assert_eq!(
            report,
            Report {
                accepted: 7,
                rejected: 1
            }
        );
    }

    #[tokio::test]
    async fn test_fail_fast_stops() {
        let scenario = Scenario::from_json(
            r#"{ "steps": [
                { "action": "post", "caller": "researcher", "metadata": "QmProblem", "bounty": "1" },
                { "action": "mint", "identity": "researcher", "amount": "1" }
            ] }"#,
        )
        .unwrap();

        let report = run(RegistryConfig::default(), &scenario, true).await.unwrap();

        assert_eq!(
            report,
            Report {
                accepted: 0,
                rejected: 1
            }
        );
    }
}
