use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, Default, PartialEq, Eq)]
pub enum Commands {
    /// Open the interactive chat (default)
    #[default]
    Chat,

    /// Ask a single question, stream the answer to stdout and exit
    Ask {
        /// The question; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
}
