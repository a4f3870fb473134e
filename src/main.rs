use anyhow::Context;
use fenrir::cli::{self, Invocation};
use fenrir::{FenrirError, RunOptions, Toolchain};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {e:#}", cli::COMMAND_NAME);
            e.downcast_ref::<FenrirError>()
                .map_or(1, FenrirError::exit_code)
        }
    };
    std::process::exit(code);
}

fn run() -> anyhow::Result<i32> {
    let args = cli::normalize_args(std::env::args().skip(1).collect());
    let command = match cli::parse_args(&args) {
        Invocation::Run(command) => command,
        Invocation::Exit { output, code } => {
            if code == 0 {
                println!("{output}");
            } else {
                eprintln!("{output}");
            }
            return Ok(code);
        }
    };

    let toolchain = Toolchain::default();
    if command.emit {
        let compiled = toolchain.compile(&command.file)?;
        print!("{}", compiled.program);
        return Ok(0);
    }

    let options = RunOptions {
        timeout: command.timeout(),
        ..RunOptions::default()
    };
    let execution = toolchain
        .run(&command.file, &options)
        .with_context(|| format!("running {}", command.file.display()))?;
    Ok(execution.exit_code)
}
