//! Sprint planning engine.
//!
//! Assigns a backlog of features and stories to fixed-length sprints across
//! teams with bounded capacity, honoring dependencies, deadlines, and
//! WSJF / cost-of-delay priorities, then reports the risks in the result.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Feature`, `Story`, `Team`, `SprintCalendar`,
//!   `Schedule`, `Risk`, `EventLog`
//! - **`validation`**: Backlog hygiene checks (duplicate IDs, ownership, effort)
//! - **`graph`**: Dependency DAG with cycle detection and priority-broken
//!   topological order
//! - **`prioritization`**: Rule-based ranking (WSJF, cost of delay, deadlines)
//! - **`ledger`**: Per-(team, sprint) capacity reservations
//! - **`planner`**: Standard and dependency-aware scheduling strategies
//! - **`risk`**: Deterministic risk detection over a finished schedule
//! - **`source`**: Work item ingestion from typed or raw tracker records
//! - **`narrative`**: Optional plain-text plan summaries
//! - **`config`**: TOML / YAML planning configuration
//!
//! # Pipeline
//!
//! ```text
//! DataSource -> Backlog -> Planner (graphs, ranking, ledger) -> PlanRun
//!                                                          -> RiskDetector -> Narrator
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use pi_planner::models::{Backlog, Feature, SprintCalendar, Story, Team};
//! use pi_planner::planner::{Planner, StrategyKind};
//! use pi_planner::risk::RiskDetector;
//!
//! let calendar = SprintCalendar::new(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(), 14, 3);
//! let backlog = Backlog::new()
//!     .with_feature(Feature::new("F1").with_team("alpha"))
//!     .with_story(Story::new("S1", "F1").with_effort(5.0))
//!     .with_story(Story::new("S2", "F1").with_effort(5.0).with_dependency("S1"));
//!
//! let planner = Planner::new(calendar.clone(), vec![Team::new("alpha", 8.0)], StrategyKind::DependencyAware);
//! let run = planner.run(&backlog).unwrap();
//! assert_eq!(run.schedule.assignment_for_story("S2").unwrap().sprint, 1);
//!
//! let risks = RiskDetector::new(calendar).analyze_run(&run, &backlog);
//! assert!(risks.is_empty());
//! ```
//!
//! # References
//!
//! - Reinertsen (2009), "The Principles of Product Development Flow"
//! - Leffingwell (2011), "Agile Software Requirements"
//! - Kahn (1962), "Topological sorting of large networks", CACM 5(11)

pub mod config;
pub mod error;
pub mod graph;
pub mod ledger;
pub mod models;
pub mod narrative;
pub mod planner;
pub mod prioritization;
pub mod risk;
pub mod source;
pub mod validation;

pub use error::{PlanningError, Result};
