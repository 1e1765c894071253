/// In-process RESP server for exercising the `redis`-backed clients
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

type Handler = Arc<dyn Fn(&[String]) -> Option<String> + Send + Sync>;

type CommandLog = Arc<Mutex<Vec<Vec<String>>>>;

/// Answers each command with whatever the handler returns;
/// `None` closes the client connection and an empty reply
/// ([`resp::no_reply`]) leaves it hanging.
pub struct FakeRedisServer {
    addr: SocketAddr,
    commands: CommandLog,
}

impl FakeRedisServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&[String]) -> Option<String> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handler: Handler = Arc::new(handler);
        let commands = CommandLog::default();

        let counter = Arc::clone(&commands);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&handler), Arc::clone(&counter)));
            }
        });

        Self { addr, commands }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Total commands received across all connections
    pub fn command_count(&self) -> usize {
        self.commands.lock().unwrap().len()
    }

    /// Every command received so far, in arrival order
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }
}

async fn serve(stream: TcpStream, handler: Handler, commands: CommandLog) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    while let Some(cmd) = read_command(&mut reader).await {
        let reply = handler(&cmd);
        commands.lock().unwrap().push(cmd);
        match reply {
            Some(reply) if reply.is_empty() => std::future::pending::<()>().await,
            Some(reply) => {
                if writer.write_all(reply.as_bytes()).await.is_err() {
                    return;
                }
            }
            None => return,
        }
    }
}

async fn read_command<R>(reader: &mut BufReader<R>) -> Option<Vec<String>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await.ok()? == 0 {
        return None;
    }
    let count: usize = line.trim_end().strip_prefix('*')?.parse().ok()?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await.ok()?;
        let len: usize = line.trim_end().strip_prefix('$')?.parse().ok()?;

        let mut data = vec![0u8; len + 2];
        reader.read_exact(&mut data).await.ok()?;
        data.truncate(len);
        args.push(String::from_utf8(data).ok()?);
    }
    Some(args)
}

/// RESP2 reply builders
pub mod resp {
    /// Never answer, simulating a stalled node
    pub fn no_reply() -> String {
        String::new()
    }

    pub fn simple(s: &str) -> String {
        format!("+{}\r\n", s)
    }

    pub fn error(s: &str) -> String {
        format!("-{}\r\n", s)
    }

    pub fn bulk(s: &str) -> String {
        format!("${}\r\n{}\r\n", s.len(), s)
    }

    pub fn array(items: &[String]) -> String {
        let mut out = format!("*{}\r\n", items.len());
        for item in items {
            out.push_str(item);
        }
        out
    }

    /// Flat key/value array, the shape sentinels use for node state
    pub fn fields(pairs: &[(&str, &str)]) -> String {
        let items: Vec<String> = pairs
            .iter()
            .flat_map(|(k, v)| [bulk(k), bulk(v)])
            .collect();
        array(&items)
    }
}
