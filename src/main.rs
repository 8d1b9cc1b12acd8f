extern crate straincomp;

extern crate clap;
use clap::*;

extern crate log;

extern crate bird_tool_utils;
use bird_tool_utils::clap_utils::*;

static PROGRAM_NAME: &str = "straincomp";

fn main() {
    let app = build_cli();
    let matches = app.clone().get_matches();
    set_log_level(&matches, false, PROGRAM_NAME, crate_version!());

    match matches.subcommand_name() {
        Some("compare") => {
            straincomp::comparison_argument_parsing::run_compare_subcommand(
                &matches,
                PROGRAM_NAME,
                crate_version!(),
            );
        }
        _ => panic!("Programming error"),
    }
}

fn build_cli() -> Command {
    let mut app = add_clap_verbosity_flags(Command::new(PROGRAM_NAME))
        .version(crate_version!())
        .author(straincomp::AUTHOR)
        .about("Composite genomic similarity and hierarchical clustering of bacterial strains")
        .arg_required_else_help(true);

    app = straincomp::comparison_argument_parsing::add_compare_subcommand(app);
    return app;
}
