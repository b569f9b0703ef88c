use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "tool-client")]
#[command(about = "Connect to a tool server over SSE, list its tools and call one", long_about = None)]
pub struct ClientArgs {
    #[arg(help = "SSE endpoint of the server [default: http://localhost:8020/sse]")]
    pub url: Option<String>,

    #[arg(
        long = "call",
        help = "Tool to call; repeat to call several in order [default: greet]"
    )]
    pub calls: Vec<String>,

    #[arg(
        long = "args",
        help = "JSON object of arguments for the matching --call [default: {\"name\": \"Ford\"}]"
    )]
    pub arguments: Vec<String>,

    #[arg(long = "timeout", help = "Seconds to wait for each response")]
    pub timeout: Option<u64>,

    #[arg(short = 'v', long = "verbose", help = "Log protocol traffic")]
    pub verbose: bool,
}

#[derive(Parser, Debug, Default)]
#[command(name = "tool-server")]
#[command(about = "Serve the registered tools over SSE", long_about = None)]
pub struct ServerArgs {
    #[arg(long = "host", help = "Address to bind [default: 127.0.0.1]")]
    pub host: Option<String>,

    #[arg(long = "port", help = "Port to bind [default: 8020]")]
    pub port: Option<u16>,

    #[arg(long = "tool-timeout", help = "Seconds a tool may run before it is cancelled")]
    pub tool_timeout: Option<u64>,

    #[arg(short = 'v', long = "verbose", help = "Enable debug logging")]
    pub verbose: bool,
}
