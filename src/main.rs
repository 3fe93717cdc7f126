extern crate corella;

extern crate clap;
use clap::*;

extern crate log;

extern crate bird_tool_utils;
use bird_tool_utils::clap_utils::*;

static PROGRAM_NAME: &str = "Corella";

fn main() {
    let app = build_cli();
    let matches = app.clone().get_matches();
    set_log_level(&matches, false, PROGRAM_NAME, crate_version!());

    match matches.subcommand_name() {
        Some("curate") => {
            let m = matches.subcommand_matches("curate").unwrap();
            set_log_level(m, true, PROGRAM_NAME, crate_version!());
            corella::curate_argument_parsing::run_curate_subcommand(m);
        }
        _ => panic!("Programming error"),
    }
}

fn build_cli() -> Command {
    let app = add_clap_verbosity_flags(Command::new("corella"))
        .version(crate_version!())
        .about("Curate marker gene alignments into a concatenated MSA for tree inference")
        .arg_required_else_help(true);

    corella::curate_argument_parsing::add_curate_subcommand(app)
}
