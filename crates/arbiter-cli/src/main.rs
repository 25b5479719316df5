//! Arbiter CLI
//!
//! The `arbiter` command drives a local, file-backed verification ledger.
//!
//! ## Commands
//!
//! - `init`, `fund`, `balance`: set up the world and move test funds in
//! - `agent`: register and manage agents
//! - `task`: run the bonded task lifecycle
//! - `skills`: build and check skill-set Merkle commitments

mod world;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use arbiter_core::artifacts::{load_verified_artifact, store_artifact};
use arbiter_core::metrics::METRICS;
use arbiter_core::skill_tree::{self, SkillTree};
use arbiter_core::{
    format_amount, parse_amount, AccountId, AgentId, AgentSpec, Amount,
    AllowlistResolver, Clock, Hash32, ManualClock, ProtocolConfig, ReferenceOutputResolver,
    Resolver, Settlement, SystemClock, TaskId, TaskState, ValueLedger, Verdict,
};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};

use world::{CliLedger, StateDir, World};

#[derive(Parser)]
#[command(name = "arbiter")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dispute-driven economic verification for AI agents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Directory holding state.json and the artifact store
    #[arg(long, global = true, env = "ARBITER_STATE_DIR", default_value = ".arbiter")]
    state_dir: PathBuf,

    /// Protocol configuration (TOML); overrides the stored configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Account performing the action
    #[arg(long = "as", global = true, env = "ARBITER_ACCOUNT")]
    caller: Option<String>,

    /// Evaluate deadlines at this instant (RFC 3339) instead of now
    #[arg(long, global = true)]
    at: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fresh state directory
    Init {
        /// Overwrite existing state
        #[arg(long)]
        force: bool,
    },

    /// Credit an account with new funds
    Fund {
        account: String,

        /// Decimal amount in units (18 decimals)
        #[arg(value_parser = parse_amount_arg)]
        amount: Amount,
    },

    /// Show one balance, or all non-zero balances
    Balance { account: Option<String> },

    /// Agent registry operations
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },

    /// Task lifecycle operations
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Skill-set Merkle commitments
    Skills {
        #[command(subcommand)]
        action: SkillsAction,
    },
}

#[derive(Args, Clone)]
struct SpecArgs {
    /// Model weights commitment (hex)
    #[arg(long)]
    model: Hash32,

    /// Inference configuration commitment (hex)
    #[arg(long)]
    config_hash: Hash32,

    /// Skill in `name@version` form; repeat for each skill
    #[arg(long = "skill", required_unless_present = "skills_root")]
    skills: Vec<String>,

    /// Precomputed skill root (hex), instead of --skill
    #[arg(long, conflicts_with = "skills")]
    skills_root: Option<Hash32>,

    #[arg(long, default_value_t = 4096)]
    max_tokens: u32,

    /// Hundredths, 0..=100
    #[arg(long, default_value_t = 0)]
    temperature: u8,

    /// Hundredths, 0..=100
    #[arg(long, default_value_t = 100)]
    top_p: u8,

    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Subcommand)]
enum AgentAction {
    /// Register a new agent owned by --as
    Register {
        #[command(flatten)]
        spec: SpecArgs,

        #[arg(long, default_value = "")]
        metadata_uri: String,
    },
    /// Replace an agent's spec (resets reputation)
    Update {
        agent: u64,

        #[command(flatten)]
        spec: SpecArgs,
    },
    /// Hand an agent to a new owner
    Transfer { agent: u64, new_owner: String },
    /// Print an agent record
    Show { agent: u64 },
    /// Stop accepting new tasks
    Deactivate { agent: u64 },
    /// Accept new tasks again
    Reactivate { agent: u64 },
    /// Override the challenge window for future tasks
    SetWindow {
        agent: u64,

        /// Window length in seconds
        #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
        secs: Option<i64>,

        /// Restore the protocol default
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Open a task and escrow the fee
    Submit {
        #[arg(long)]
        agent: u64,

        #[arg(long, value_parser = parse_amount_arg)]
        fee: Amount,

        /// Input file; stored in the artifact store
        #[arg(long, conflicts_with = "input")]
        input_file: Option<PathBuf>,

        /// Input commitment (hex), when the input lives elsewhere
        #[arg(long, requires = "pointer", required_unless_present = "input_file")]
        input: Option<Hash32>,

        #[arg(long)]
        pointer: Option<String>,
    },
    /// Stake a bond on a pending task
    Bond {
        task: u64,

        #[arg(value_parser = parse_amount_arg)]
        amount: Amount,
    },
    /// Publish the output commitment
    Publish {
        task: u64,

        #[arg(long, conflicts_with = "output")]
        output_file: Option<PathBuf>,

        #[arg(long, requires = "pointer", required_unless_present = "output_file")]
        output: Option<Hash32>,

        #[arg(long)]
        pointer: Option<String>,
    },
    /// Dispute a published output
    Challenge {
        task: u64,

        /// Output the challenger claims is correct (hex)
        #[arg(long, required_unless_present = "claimed_file")]
        claimed: Option<Hash32>,

        /// File holding the correct output; stored as evidence
        #[arg(long, conflicts_with = "claimed")]
        claimed_file: Option<PathBuf>,

        #[arg(long, default_value = "")]
        evidence: String,

        #[arg(long, value_parser = parse_amount_arg)]
        bond: Amount,
    },
    /// Settle a dispute
    Resolve {
        task: u64,

        /// Verdict asserted by the --as arbiter
        #[arg(long, value_enum, required_unless_present = "reference")]
        verdict: Option<VerdictArg>,

        /// Recomputed output commitment; the matching side wins
        #[arg(long, conflicts_with = "verdict")]
        reference: Option<Hash32>,
    },
    /// Pay an unchallenged agent after the window closes
    Claim { task: u64 },
    /// Refund the client after a missed execution deadline
    Expire { task: u64 },
    /// Print a task with its challenge
    Show {
        task: u64,

        /// Fetch and verify the stored output artifact
        #[arg(long)]
        verify_output: bool,
    },
    /// List tasks
    List {
        #[arg(long)]
        state: Option<TaskState>,

        #[arg(long)]
        agent: Option<u64>,

        /// Only tasks a keeper can expire or claim now
        #[arg(long)]
        due: bool,
    },
    /// Print the event log
    Events { task: Option<u64> },
}

#[derive(Subcommand)]
enum SkillsAction {
    /// Root over `name@version` skills, in order
    Root {
        #[arg(required = true)]
        skills: Vec<String>,
    },
    /// Membership proof for the skill at INDEX
    Proof {
        index: usize,

        #[arg(required = true)]
        skills: Vec<String>,
    },
    /// Check a proof against a root, or against an agent's committed root
    Verify {
        /// Skill in `name@version` form
        skill: String,

        #[arg(long, required_unless_present = "agent")]
        root: Option<Hash32>,

        #[arg(long, conflicts_with = "root")]
        agent: Option<u64>,

        /// Sibling hashes, leaf to root
        #[arg(long, value_delimiter = ',')]
        proof: Vec<Hash32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum VerdictArg {
    Agent,
    Challenger,
}

impl From<VerdictArg> for Verdict {
    fn from(arg: VerdictArg) -> Self {
        match arg {
            VerdictArg::Agent => Verdict::AgentWins,
            VerdictArg::Challenger => Verdict::ChallengerWins,
        }
    }
}

fn parse_amount_arg(raw: &str) -> std::result::Result<Amount, String> {
    parse_amount(raw).map_err(|e| e.to_string())
}

/// Global flags every command needs.
struct Ctx {
    store: StateDir,
    config: Option<PathBuf>,
    caller: Option<String>,
    at: Option<DateTime<Utc>>,
}

impl Ctx {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            store: StateDir::new(&cli.state_dir),
            config: cli.config.clone(),
            caller: cli.caller.clone(),
            at: cli.at,
        }
    }

    fn caller(&self) -> Result<AccountId> {
        self.caller
            .as_deref()
            .map(AccountId::from)
            .ok_or_else(|| anyhow!("This command needs --as <account>"))
    }

    fn clock(&self) -> Arc<dyn Clock> {
        match self.at {
            Some(at) => Arc::new(ManualClock::new(at)),
            None => Arc::new(SystemClock),
        }
    }

    fn load_config(&self) -> Result<Option<ProtocolConfig>> {
        self.config
            .as_deref()
            .map(|path| {
                ProtocolConfig::load(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))
            })
            .transpose()
    }

    fn open(&self) -> Result<CliLedger> {
        let mut world = self.store.load()?;
        if let Some(config) = self.load_config()? {
            world.config = config;
        }
        world.into_ledger(self.clock())
    }

    /// Run `op` against the ledger and persist only if it succeeds.
    fn with_ledger<T>(&self, op: impl FnOnce(&mut CliLedger) -> Result<T>) -> Result<T> {
        let mut ledger = self.open()?;
        let out = op(&mut ledger)?;
        self.store.save(&World::from_ledger(ledger))?;
        Ok(out)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    arbiter_core::telemetry::init_tracing(cli.json, level);

    let ctx = Ctx::from_cli(&cli);
    let result = run(&ctx, cli.command).await;
    if cli.verbose {
        METRICS.flush();
    }
    result
}

async fn run(ctx: &Ctx, command: Commands) -> Result<()> {
    match command {
        Commands::Init { force } => cmd_init(ctx, force),
        Commands::Fund { account, amount } => cmd_fund(ctx, &account, amount),
        Commands::Balance { account } => cmd_balance(ctx, account.as_deref()),
        Commands::Agent { action } => match action {
            AgentAction::Register { spec, metadata_uri } => {
                cmd_agent_register(ctx, &spec, &metadata_uri)
            }
            AgentAction::Update { agent, spec } => cmd_agent_update(ctx, AgentId(agent), &spec),
            AgentAction::Transfer { agent, new_owner } => {
                cmd_agent_transfer(ctx, AgentId(agent), &new_owner)
            }
            AgentAction::Show { agent } => cmd_agent_show(ctx, AgentId(agent)),
            AgentAction::Deactivate { agent } => cmd_agent_activation(ctx, AgentId(agent), false),
            AgentAction::Reactivate { agent } => cmd_agent_activation(ctx, AgentId(agent), true),
            AgentAction::SetWindow { agent, secs, clear } => {
                cmd_agent_set_window(ctx, AgentId(agent), if clear { None } else { secs })
            }
        },
        Commands::Task { action } => match action {
            TaskAction::Submit {
                agent,
                fee,
                input_file,
                input,
                pointer,
            } => {
                let (commitment, pointer) =
                    resolve_artifact(ctx, input_file.as_deref(), input, pointer).await?;
                cmd_task_submit(ctx, AgentId(agent), commitment, pointer, fee)
            }
            TaskAction::Bond { task, amount } => cmd_task_bond(ctx, TaskId(task), amount),
            TaskAction::Publish {
                task,
                output_file,
                output,
                pointer,
            } => {
                let (commitment, pointer) =
                    resolve_artifact(ctx, output_file.as_deref(), output, pointer).await?;
                cmd_task_publish(ctx, TaskId(task), commitment, pointer)
            }
            TaskAction::Challenge {
                task,
                claimed,
                claimed_file,
                evidence,
                bond,
            } => {
                let (claimed, evidence) = match claimed_file {
                    Some(path) => {
                        resolve_artifact(ctx, Some(path.as_path()), None, None).await?
                    }
                    None => {
                        let claimed = claimed.ok_or_else(|| anyhow!("--claimed is required"))?;
                        (claimed, evidence)
                    }
                };
                cmd_task_challenge(ctx, TaskId(task), claimed, evidence, bond)
            }
            TaskAction::Resolve {
                task,
                verdict,
                reference,
            } => cmd_task_resolve(ctx, TaskId(task), verdict.map(Verdict::from), reference),
            TaskAction::Claim { task } => cmd_task_claim(ctx, TaskId(task)),
            TaskAction::Expire { task } => cmd_task_expire(ctx, TaskId(task)),
            TaskAction::Show {
                task,
                verify_output,
            } => cmd_task_show(ctx, TaskId(task), verify_output).await,
            TaskAction::List { state, agent, due } => {
                cmd_task_list(ctx, state, agent.map(AgentId), due)
            }
            TaskAction::Events { task } => cmd_task_events(ctx, task.map(TaskId)),
        },
        Commands::Skills { action } => match action {
            SkillsAction::Root { skills } => cmd_skills_root(&skills),
            SkillsAction::Proof { index, skills } => cmd_skills_proof(index, &skills),
            SkillsAction::Verify {
                skill,
                root,
                agent,
                proof,
            } => cmd_skills_verify(ctx, &skill, root, agent.map(AgentId), &proof),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse `name@version` into a skill leaf.
fn parse_skill(raw: &str) -> Result<Hash32> {
    let (name, version) = raw
        .rsplit_once('@')
        .ok_or_else(|| anyhow!("Skill must look like name@version: {raw}"))?;
    if name.is_empty() || version.is_empty() {
        bail!("Skill must look like name@version: {raw}");
    }
    Ok(skill_tree::skill_id(name, version))
}

fn parse_skills(raw: &[String]) -> Result<Vec<Hash32>> {
    raw.iter().map(|s| parse_skill(s)).collect()
}

fn build_spec(args: &SpecArgs) -> Result<AgentSpec> {
    let skills_root = match args.skills_root {
        Some(root) => root,
        None => skill_tree::compute_root(&parse_skills(&args.skills)?)?,
    };
    Ok(AgentSpec::new(
        args.model,
        args.config_hash,
        skills_root,
        args.max_tokens,
        args.temperature,
        args.top_p,
        args.seed,
    )?)
}

/// Either store `file` in the artifact store, or take an explicit
/// commitment and pointer.
async fn resolve_artifact(
    ctx: &Ctx,
    file: Option<&Path>,
    commitment: Option<Hash32>,
    pointer: Option<String>,
) -> Result<(Hash32, String)> {
    if let Some(path) = file {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let cas = ctx.store.cas().await?;
        let stored = store_artifact(&cas, &bytes).await?;
        info!(pointer = %stored.pointer, "artifact stored");
        return Ok((stored.commitment, stored.pointer));
    }
    let commitment = commitment.ok_or_else(|| anyhow!("A commitment or a file is required"))?;
    Ok((commitment, pointer.unwrap_or_default()))
}

fn print_settlement(task_id: TaskId, settlement: &Settlement) {
    println!("Task {task_id} -> {}", settlement.outcome);
    for credit in &settlement.credits {
        println!("  {:<20} {}", credit.to, format_amount(credit.amount));
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_init(ctx: &Ctx, force: bool) -> Result<()> {
    let config = ctx.load_config()?.unwrap_or_default();
    ctx.store.init(config, force)?;
    println!("Initialized Arbiter state at {}", ctx.store.root().display());
    Ok(())
}

fn cmd_fund(ctx: &Ctx, account: &str, amount: Amount) -> Result<()> {
    let account = AccountId::from(account);
    let balance = ctx.with_ledger(|ledger| {
        ledger.value_mut().deposit(&account, amount)?;
        Ok(ledger.value().balance_of(&account))
    })?;
    println!("{account}: {}", format_amount(balance));
    Ok(())
}

fn cmd_balance(ctx: &Ctx, account: Option<&str>) -> Result<()> {
    let ledger = ctx.open()?;
    match account {
        Some(account) => {
            let balance = ledger.value().balance_of(&AccountId::from(account));
            println!("{account}: {}", format_amount(balance));
        }
        None => {
            for (account, balance) in ledger.value().balances() {
                println!("{:<20} {}", account, format_amount(balance));
            }
        }
    }
    Ok(())
}

fn cmd_agent_register(ctx: &Ctx, args: &SpecArgs, metadata_uri: &str) -> Result<()> {
    let owner = ctx.caller()?;
    let spec = build_spec(args)?;
    let agent_id = ctx.with_ledger(|ledger| {
        let now = ledger.now();
        Ok(ledger
            .directory_mut()
            .register_agent(&owner, spec, metadata_uri, now)?)
    })?;
    println!("Registered agent {agent_id} owned by {owner}");
    Ok(())
}

fn cmd_agent_update(ctx: &Ctx, agent_id: AgentId, args: &SpecArgs) -> Result<()> {
    let caller = ctx.caller()?;
    let spec = build_spec(args)?;
    ctx.with_ledger(|ledger| {
        let now = ledger.now();
        Ok(ledger
            .directory_mut()
            .update_spec(&caller, agent_id, spec, now)?)
    })?;
    println!("Updated agent {agent_id}; reputation reset");
    Ok(())
}

fn cmd_agent_transfer(ctx: &Ctx, agent_id: AgentId, new_owner: &str) -> Result<()> {
    let caller = ctx.caller()?;
    let new_owner = AccountId::from(new_owner);
    ctx.with_ledger(|ledger| {
        let now = ledger.now();
        Ok(ledger
            .directory_mut()
            .transfer_ownership(&caller, agent_id, &new_owner, now)?)
    })?;
    println!("Agent {agent_id} now owned by {new_owner}");
    Ok(())
}

#[derive(Serialize)]
struct AgentView<'a> {
    #[serde(flatten)]
    agent: &'a arbiter_core::Agent,
    reputation_bps: u64,
    challenge_window_secs: i64,
}

fn cmd_agent_show(ctx: &Ctx, agent_id: AgentId) -> Result<()> {
    let ledger = ctx.open()?;
    let agent = ledger.directory().get(agent_id)?;
    print_json(&AgentView {
        agent,
        reputation_bps: agent.reputation_bps(),
        challenge_window_secs: ledger.challenge_window(agent_id)?.num_seconds(),
    })
}

fn cmd_agent_activation(ctx: &Ctx, agent_id: AgentId, active: bool) -> Result<()> {
    let caller = ctx.caller()?;
    ctx.with_ledger(|ledger| {
        let now = ledger.now();
        let directory = ledger.directory_mut();
        if active {
            directory.reactivate(&caller, agent_id, now)?;
        } else {
            directory.deactivate(&caller, agent_id, now)?;
        }
        Ok(())
    })?;
    println!(
        "Agent {agent_id} {}",
        if active { "reactivated" } else { "deactivated" }
    );
    Ok(())
}

fn cmd_agent_set_window(ctx: &Ctx, agent_id: AgentId, secs: Option<i64>) -> Result<()> {
    let caller = ctx.caller()?;
    let window = ctx.with_ledger(|ledger| {
        ledger.set_challenge_window(&caller, agent_id, secs)?;
        Ok(ledger.challenge_window(agent_id)?)
    })?;
    println!(
        "Agent {agent_id} challenge window: {}s",
        window.num_seconds()
    );
    Ok(())
}

fn cmd_task_submit(
    ctx: &Ctx,
    agent_id: AgentId,
    input: Hash32,
    pointer: String,
    fee: Amount,
) -> Result<()> {
    let client = ctx.caller()?;
    let task_id =
        ctx.with_ledger(|ledger| Ok(ledger.submit(&client, agent_id, input, pointer, fee)?))?;
    println!("Submitted task {task_id} to agent {agent_id}");
    Ok(())
}

fn cmd_task_bond(ctx: &Ctx, task_id: TaskId, amount: Amount) -> Result<()> {
    let caller = ctx.caller()?;
    ctx.with_ledger(|ledger| Ok(ledger.bond(&caller, task_id, amount)?))?;
    println!("Task {task_id} bonded with {}", format_amount(amount));
    Ok(())
}

fn cmd_task_publish(ctx: &Ctx, task_id: TaskId, output: Hash32, pointer: String) -> Result<()> {
    let caller = ctx.caller()?;
    let deadline =
        ctx.with_ledger(|ledger| Ok(ledger.publish(&caller, task_id, output, pointer)?))?;
    println!("Task {task_id} executed; challenge window closes {deadline}");
    Ok(())
}

fn cmd_task_challenge(
    ctx: &Ctx,
    task_id: TaskId,
    claimed: Hash32,
    evidence: String,
    bond: Amount,
) -> Result<()> {
    let caller = ctx.caller()?;
    ctx.with_ledger(|ledger| Ok(ledger.challenge(&caller, task_id, claimed, evidence, bond)?))?;
    println!("Task {task_id} challenged by {caller}");
    Ok(())
}

fn cmd_task_resolve(
    ctx: &Ctx,
    task_id: TaskId,
    verdict: Option<Verdict>,
    reference: Option<Hash32>,
) -> Result<()> {
    let settlement = ctx.with_ledger(|ledger| {
        let resolver: Box<dyn Resolver> = match (verdict, reference) {
            (_, Some(reference)) => Box::new(ReferenceOutputResolver::new(reference)),
            (Some(verdict), None) => Box::new(AllowlistResolver::new(
                ledger.config(),
                ctx.caller()?,
                verdict,
            )),
            (None, None) => bail!("Either --verdict or --reference is required"),
        };
        Ok(ledger.resolve_challenge(task_id, resolver.as_ref())?)
    })?;
    print_settlement(task_id, &settlement);
    Ok(())
}

fn cmd_task_claim(ctx: &Ctx, task_id: TaskId) -> Result<()> {
    let settlement = ctx.with_ledger(|ledger| Ok(ledger.claim_bonds(task_id)?))?;
    print_settlement(task_id, &settlement);
    Ok(())
}

fn cmd_task_expire(ctx: &Ctx, task_id: TaskId) -> Result<()> {
    let settlement = ctx.with_ledger(|ledger| Ok(ledger.expire_task(task_id)?))?;
    print_settlement(task_id, &settlement);
    Ok(())
}

#[derive(Serialize)]
struct TaskView<'a> {
    task: &'a arbiter_core::Task,
    challenge: Option<&'a arbiter_core::Challenge>,
}

async fn cmd_task_show(ctx: &Ctx, task_id: TaskId, verify_output: bool) -> Result<()> {
    let ledger = ctx.open()?;
    let task = ledger.task(task_id)?;
    print_json(&TaskView {
        task,
        challenge: ledger.challenge_of(task_id).ok(),
    })?;

    if verify_output {
        let (Some(commitment), Some(pointer)) = (task.output_commitment, &task.output_pointer)
        else {
            bail!("Task {task_id} has no published output");
        };
        let cas = ctx.store.cas().await?;
        let bytes = load_verified_artifact(&cas, pointer, &commitment).await?;
        println!("Output verified: {} bytes match {}", bytes.len(), commitment.short());
    }
    Ok(())
}

fn cmd_task_list(
    ctx: &Ctx,
    state: Option<TaskState>,
    agent: Option<AgentId>,
    due: bool,
) -> Result<()> {
    let ledger = ctx.open()?;
    let due_ids: Vec<TaskId> = if due {
        let mut ids = ledger.expirable_tasks();
        ids.extend(ledger.claimable_tasks());
        ids
    } else {
        Vec::new()
    };

    let tasks = ledger
        .tasks()
        .filter(|t| state.map_or(true, |s| t.state == s))
        .filter(|t| agent.map_or(true, |a| t.agent_id == a))
        .filter(|t| !due || due_ids.contains(&t.id));
    for task in tasks {
        println!(
            "{:>6}  agent {:<4} {:<22} fee {}",
            task.id,
            task.agent_id,
            task.state,
            format_amount(task.fee)
        );
    }
    Ok(())
}

fn cmd_task_events(ctx: &Ctx, task: Option<TaskId>) -> Result<()> {
    let ledger = ctx.open()?;
    match task {
        Some(task_id) => print_json(&ledger.events_for(task_id)),
        None => print_json(&ledger.events()),
    }
}

fn cmd_skills_root(skills: &[String]) -> Result<()> {
    let leaves = parse_skills(skills)?;
    println!("{}", skill_tree::compute_root(&leaves)?);
    Ok(())
}

fn cmd_skills_proof(index: usize, skills: &[String]) -> Result<()> {
    let leaves = parse_skills(skills)?;
    let tree = SkillTree::build(&leaves)?;
    let proof = tree.proof(index)?;
    println!("root  {}", tree.root());
    println!("leaf  {}", leaves[index]);
    let joined: Vec<String> = proof.iter().map(Hash32::to_hex).collect();
    println!("proof {}", joined.join(","));
    Ok(())
}

fn cmd_skills_verify(
    ctx: &Ctx,
    skill: &str,
    root: Option<Hash32>,
    agent: Option<AgentId>,
    proof: &[Hash32],
) -> Result<()> {
    let leaf = parse_skill(skill)?;
    let valid = match (root, agent) {
        (Some(root), _) => skill_tree::verify(&root, &leaf, proof),
        (None, Some(agent_id)) => ctx
            .open()?
            .directory()
            .verify_agent_skill(agent_id, &leaf, proof)?,
        (None, None) => bail!("Either --root or --agent is required"),
    };
    println!("{}", if valid { "valid" } else { "invalid" });
    if !valid {
        std::process::exit(1);
    }
    Ok(())
}
