use trellis::{
    cli::{exit_code, Opts},
    config::EnvConfig,
    errors::TrellisError,
    logging,
    picker::{
        toml::{Config, Picker},
        Settings,
    },
    runner::{summary, Runner},
    test::TestNode,
};

use colored::*;
use structopt::StructOpt;

/// Print the discovered tree in dry run mode.
fn dry_run(node: &TestNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match node {
        TestNode::Case(case) => match case.ignore_reason() {
            Some(reason) => println!("{}{} (ignored: {})", indent, case.full_name().yellow(), reason),
            None => println!("{}{}", indent, case.full_name().blue()),
        },
        TestNode::Suite(suite) => {
            println!(
                "{}{} ({} tests)",
                indent,
                suite.full_name().bold(),
                suite.test_case_count()
            );
            for child in suite.children() {
                dry_run(child, depth + 1);
            }
        }
    }
}

fn run() -> Result<i32, TrellisError> {
    let opts = Opts::from_args();
    let env = EnvConfig::load();
    logging::init_logger(opts.log_level, env.log.as_deref());
    if opts.no_color {
        colored::control::set_override(false);
    }

    let conf = Config::from_path(&opts.dir)?;
    let mut options = conf.runner.clone().with_env(&env);
    if opts.network {
        options.network = true;
    }
    if let Some(host) = opts.host {
        options.host_name = host;
    }
    if let Some(port) = opts.port {
        options.host_port = port;
    }
    // Tests run next to the trellis.toml unless told otherwise.
    options.work_directory = Some(match options.work_directory.take() {
        Some(dir) => opts.dir.join(dir),
        None => opts.dir.clone(),
    });

    let mut settings = Settings::new();
    if let Some(include) = opts.include_filter {
        settings.insert("include".to_string(), include);
    }
    if let Some(exclude) = opts.exclude_filter {
        settings.insert("exclude".to_string(), exclude);
    }

    let module = opts.dir.to_string_lossy().into_owned();
    let mut runner = Runner::new(options);
    let node = TestNode::from(runner.load(&Picker::with_config(conf), &module, Some(&settings))?);

    if opts.dry_run {
        dry_run(&node, 0);
        return Ok(0);
    }

    runner.try_open_writer(&module)?;
    let result = runner.run(&node);
    if let Some(writer) = runner.writer() {
        writer.write_line(&format!("  {}", summary(&result)))?;
    }
    runner.close_writer()?;

    Ok(exit_code(result.counts().fail))
}

fn main() {
    std::process::exit(match run() {
        Err(err) => {
            println!("error: {}", err);
            1
        }
        Ok(failed_tests) => failed_tests,
    })
}
