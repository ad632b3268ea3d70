//! GeminiBuddy - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use geminibuddy::{
    cli::{load_api_key, Args, Commands, Config, OntologyCommand, Verbosity},
    errors::BuddyError,
    execution::{facts_turn, home_turn, lookup_violation, traffic_intent_turn},
    intent::{IntentDomain, IntentParser},
    ontology::{Device, HomeTheaterStore, NewVehicle, OntologyStore},
    providers::{EmbeddingProvider, GeminiClient, GenerativeModel},
    rag::{DocumentStore, RagPipeline, SimilarityRanker},
    recap::{MeetingRecapper, RecapOutcome},
    repl::{DisplayManager, ReplSession},
    tools::{
        implementations::{
            light_tools, ontology_tools, pet_tools, LightContext, OntologyContext, PetContext,
            LIGHT_SYSTEM_PROMPT, PET_SYSTEM_PROMPT, TRAFFIC_SYSTEM_PROMPT,
        },
        ToolDispatcher, ToolRegistry,
    },
};

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    init_tracing(verbosity);

    let config = Config::load(args.config.clone())?;
    config.validate()?;

    let display = DisplayManager::new().with_stages(verbosity.show_stages());

    if args.needs_api_key() {
        let client = Arc::new(config.gemini_client(load_api_key()?)?);
        run_remote(&args.command, &config, client, verbosity, display).await
    } else {
        run_local(&args.command, &config, display)
    }
}

/// Commands that only touch local files
fn run_local(command: &Commands, config: &Config, display: DisplayManager) -> Result<()> {
    match command {
        Commands::Ontology { command } => match run_ontology(config, command, &display) {
            Err(e) if e.is_user_facing() => {
                display.show_warning(&e.to_string());
                std::process::exit(1);
            }
            other => Ok(other?),
        },
        Commands::Lookup { question } => run_lookup(config, question.as_deref(), display),
        Commands::Home { status: true } => show_home_status(config),
        other => anyhow::bail!("{:?} needs the Gemini API", other),
    }
}

/// Commands that call the Gemini API
async fn run_remote(
    command: &Commands,
    config: &Config,
    client: Arc<GeminiClient>,
    verbosity: Verbosity,
    display: DisplayManager,
) -> Result<()> {
    match command {
        Commands::Ask {
            question,
            faq,
            top_k,
            no_rerank,
        } => {
            let options = AskOptions {
                faq: faq.clone(),
                top_k: *top_k,
                no_rerank: *no_rerank,
            };
            run_ask(config, client, question.as_deref(), options, verbosity, display).await
        }
        Commands::Pets => {
            run_tool_chat(
                config,
                client,
                display,
                "Pet Chat",
                pet_tools(),
                PET_SYSTEM_PROMPT,
                PetContext::default(),
            )
            .await
        }
        Commands::Lights => {
            run_tool_chat(
                config,
                client,
                display,
                "Light Switch",
                light_tools(),
                LIGHT_SYSTEM_PROMPT,
                LightContext::default(),
            )
            .await
        }
        Commands::Traffic {
            intent: false,
            facts: false,
        } => {
            let context = OntologyContext::new(OntologyStore::new(config.ontology_path()));
            run_tool_chat(
                config,
                client,
                display,
                "Traffic Assistant",
                ontology_tools(),
                TRAFFIC_SYSTEM_PROMPT,
                context,
            )
            .await
        }
        Commands::Traffic { intent: true, .. } => run_traffic_intent(config, client, display).await,
        Commands::Traffic { facts: true, .. } => run_traffic_facts(config, client, display).await,
        Commands::Home { .. } => run_home(config, client, display).await,
        Commands::Recap { input, output } => run_recap(client, input.as_deref(), output).await,
        Commands::Models => list_models(&client).await,
        Commands::Ontology { .. } | Commands::Lookup { .. } => run_local(command, config, display),
    }
}

fn model_handle(client: &Arc<GeminiClient>) -> Arc<dyn GenerativeModel> {
    client.clone()
}

fn repl_session(config: &Config, display: DisplayManager) -> Result<ReplSession> {
    ReplSession::with_history(config.history_path(), display)
}

/// Show a failed turn and keep the session going, unless the error is fatal
fn report_turn_error(session: &ReplSession, error: BuddyError) -> Result<()> {
    if error.is_fatal() {
        return Err(error.into());
    }
    session.display().show_error(&error.to_string());
    Ok(())
}

struct AskOptions {
    faq: Option<PathBuf>,
    top_k: Option<usize>,
    no_rerank: bool,
}

/// Answer FAQ questions, once or in a loop
async fn run_ask(
    config: &Config,
    client: Arc<GeminiClient>,
    question: Option<&str>,
    options: AskOptions,
    verbosity: Verbosity,
    display: DisplayManager,
) -> Result<()> {
    let faq_path = options.faq.unwrap_or_else(|| config.faq_path());
    let documents = DocumentStore::load(&faq_path)
        .with_context(|| format!("reading FAQ file {}", faq_path.display()))?;

    let rag_config = config.rag_config_with(options.top_k, options.no_rerank)?;

    let spinner = verbosity
        .show_progress()
        .then(|| display.spinner(&format!("Embedding {} FAQ entries", documents.len())));
    let embedder: Arc<dyn EmbeddingProvider> = client.clone();
    let ranker = SimilarityRanker::build(documents, embedder).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let pipeline = RagPipeline::new(ranker?, model_handle(&client), rag_config);

    if let Some(question) = question {
        let answer = pipeline.answer(question).await?;
        display.show_answer(&answer);
        return Ok(());
    }

    let mut session = repl_session(config, display)?;
    session.display().show_banner(
        "FAQ Assistant",
        client.chat_model(),
        &format!("{} entries from {}", pipeline.ranker().store().len(), faq_path.display()),
    );
    while let Some(question) = session.next_input()? {
        let spinner = session.display().spinner("Thinking");
        let result = pipeline.answer(&question).await;
        spinner.finish_and_clear();
        match result {
            Ok(answer) => session.display().show_answer(&answer),
            Err(e) => report_turn_error(&session, e)?,
        }
    }
    session.save()?;
    Ok(())
}

/// Chat loop where the model may call local tools
async fn run_tool_chat<C>(
    config: &Config,
    client: Arc<GeminiClient>,
    display: DisplayManager,
    title: &str,
    registry: ToolRegistry<C>,
    system_prompt: &str,
    mut context: C,
) -> Result<()> {
    let hint = format!("Tools: {}", registry.tool_names().join(", "));
    let mut dispatcher = ToolDispatcher::new(model_handle(&client), registry)
        .with_system_instruction(system_prompt)
        .with_max_tool_rounds(config.tools.max_tool_rounds);

    let mut session = repl_session(config, display)?;
    session.display().show_banner(title, client.chat_model(), &hint);
    while let Some(line) = session.next_input()? {
        match dispatcher.send(&mut context, &line).await {
            Ok(report) => session.display().show_turn(&report),
            Err(e) => report_turn_error(&session, e)?,
        }
    }

    let stats = dispatcher.stats();
    tracing::info!(
        executions = stats.total_executions,
        success_rate = stats.success_rate(),
        "tool chat finished"
    );
    session.save()?;
    Ok(())
}

/// Traffic assistant with model-mapped intents
async fn run_traffic_intent(config: &Config, client: Arc<GeminiClient>, display: DisplayManager) -> Result<()> {
    let store = OntologyStore::new(config.ontology_path());
    let parser = IntentParser::new(model_handle(&client), IntentDomain::Traffic);

    let mut session = repl_session(config, display)?;
    session.set_prompt("🚗 > ");
    session.display().show_banner(
        "Traffic Assistant (intent mode)",
        client.chat_model(),
        "Ask about a plate, e.g. ABC123 違規了嗎？",
    );
    while let Some(line) = session.next_input()? {
        match traffic_intent_turn(&parser, &store, &line).await {
            Ok(answer) => session.display().show_reply(&answer.to_string()),
            Err(e) => report_turn_error(&session, e)?,
        }
    }
    session.save()?;
    Ok(())
}

/// Traffic assistant that reasons over the plate's ontology facts
async fn run_traffic_facts(config: &Config, client: Arc<GeminiClient>, display: DisplayManager) -> Result<()> {
    let store = OntologyStore::new(config.ontology_path());
    let model = model_handle(&client);

    let mut session = repl_session(config, display)?;
    session.set_prompt("🚗 > ");
    session.display().show_banner(
        "Traffic Assistant (facts mode)",
        client.chat_model(),
        &format!("Ontology: {}", store.path().display()),
    );
    while let Some(line) = session.next_input()? {
        match facts_turn(model.as_ref(), &store, &line).await {
            Ok(answer) => session.display().show_reply(&answer),
            Err(e) => report_turn_error(&session, e)?,
        }
    }
    session.save()?;
    Ok(())
}

/// Rule-based lookup: one question, or a loop without a model
fn run_lookup(config: &Config, question: Option<&str>, display: DisplayManager) -> Result<()> {
    let store = OntologyStore::new(config.ontology_path());

    if let Some(question) = question {
        let answer = lookup_violation(&store, question)?;
        display.show_reply(&answer.to_string());
        return Ok(());
    }

    let mut session = repl_session(config, display)?;
    session.set_prompt("🚗 > ");
    session.display().show_banner(
        "Violation Lookup",
        "rules only",
        &format!("Ontology: {}", store.path().display()),
    );
    while let Some(line) = session.next_input()? {
        match lookup_violation(&store, &line) {
            Ok(answer) => session.display().show_reply(&answer.to_string()),
            Err(e) => report_turn_error(&session, e)?,
        }
    }
    session.save()?;
    Ok(())
}

/// Apply one ontology event or print its contents
fn run_ontology(config: &Config, command: &OntologyCommand, display: &DisplayManager) -> geminibuddy::Result<()> {
    let store = OntologyStore::new(config.ontology_path());

    match command {
        OntologyCommand::AddVehicle {
            plate,
            vehicle_type,
            status,
            owner,
        } => {
            let mut vehicle = NewVehicle::new(plate.as_str(), vehicle_type.as_str()).with_status(*status);
            if let Some(owner) = owner {
                vehicle = vehicle.with_owner(owner.as_str());
            }
            store.add_vehicle(vehicle)?;
            display.show_success(&format!("Added vehicle {}", plate));
        }
        OntologyCommand::UpdateLicense { plate, status } => {
            let previous = store.update_license(plate, *status)?;
            display.show_success(&format!("{} license: {} → {}", plate, previous, status));
        }
        OntologyCommand::AddOwner { name, note } => {
            let owner = store.add_owner(name, note.as_deref())?;
            display.show_success(&format!("Added owner {} ({})", name, owner.note));
        }
        OntologyCommand::List => {
            let ontology = store.load()?;
            if ontology.vehicles.is_empty() {
                println!("No vehicles in {}", store.path().display());
            }
            for (plate, vehicle) in &ontology.vehicles {
                let status = if vehicle.license_status.is_expired() {
                    vehicle.license_status.as_str().red()
                } else {
                    vehicle.license_status.as_str().green()
                };
                let owner = vehicle.owner.as_deref().unwrap_or("-");
                println!("  {:<10} {:<12} {:<8} {}", plate, vehicle.vehicle_type, status, owner);
            }
        }
        OntologyCommand::Show { plate } => match store.vehicle_facts(plate)? {
            Some(facts) => facts.iter().for_each(|fact| println!("  {}", fact)),
            None => println!("Vehicle {} not found.", plate),
        },
    }
    Ok(())
}

fn show_home_status(config: &Config) -> Result<()> {
    let store = HomeTheaterStore::open(config.home_theater_path())?;
    for device in Device::ALL {
        println!("  {:<16} {}", device.to_string().bold(), store.device_state(device)?);
    }
    Ok(())
}

/// Home theater assistant
async fn run_home(config: &Config, client: Arc<GeminiClient>, display: DisplayManager) -> Result<()> {
    let store = HomeTheaterStore::open(config.home_theater_path())?;
    let parser = IntentParser::new(model_handle(&client), IntentDomain::Home);

    let mut session = repl_session(config, display)?;
    session.set_prompt("🏠 > ");
    session.display().show_banner(
        "Home Theater Assistant",
        client.chat_model(),
        "Try: dim the light to 30, what is the AC set to?",
    );
    while let Some(line) = session.next_input()? {
        match home_turn(&parser, &store, &line).await {
            Ok(turn) => {
                session.display().show_agent_state(turn.state);
                session.display().show_reply(&turn.message);
                if let Some(state) = turn.device_state {
                    session.display().show_info(&state.to_string());
                }
            }
            Err(e) => report_turn_error(&session, e)?,
        }
    }
    session.save()?;
    Ok(())
}

/// Summarise a transcript from a file or stdin
async fn run_recap(client: Arc<GeminiClient>, input: Option<&Path>, output: &Path) -> Result<()> {
    let transcript = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading transcript {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    if transcript.trim().is_empty() {
        anyhow::bail!("transcript is empty");
    }

    let recapper = MeetingRecapper::new(model_handle(&client));
    match recapper.summarise(&transcript).await? {
        RecapOutcome::Parsed(recap) => {
            recap.write_to(output)?;
            println!("{} {}", "Topic:".bold(), recap.meet_topic);
            println!("{} {}", "Participants:".bold(), recap.meeting_participants.names().join(", "));
            println!("{} {}", "Recap:".bold(), recap.recap);
            println!("{} Saved to {}", "✓".green(), output.display());
        }
        RecapOutcome::Unparsed { raw, error } => {
            eprintln!("{} Could not parse recap JSON: {}", "⚠".yellow(), error);
            println!("{}", raw);
        }
    }
    Ok(())
}

async fn list_models(client: &GeminiClient) -> Result<()> {
    let models = client.list_models().await?;
    if models.is_empty() {
        println!("No models support content generation for this key.");
        return Ok(());
    }
    println!("Available models:");
    for model in models {
        println!("  • {}", model);
    }
    Ok(())
}
