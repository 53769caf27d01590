//! Demo node: registers a pair of accounts, then mines blocks on an
//! interval, moving a little value between them each round.

use minichain::core::account::Account;
use minichain::core::transaction::Transaction;
use minichain::node::Node;
use minichain::{error, info};
use std::time::Duration;

const USAGE: &str = "\
usage: minichain [options]

options:
  --blocks <n>       stop after mining <n> blocks (default: run until ctrl-c)
  --interval <ms>    delay between blocks in milliseconds (default: 1000)
  --help             print this help and exit";

struct Options {
    blocks: Option<u64>,
    interval: Duration,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options {
        blocks: None,
        interval: Duration::from_millis(1_000),
    };
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            "--blocks" => {
                let value = args.next().ok_or("--blocks requires a value")?;
                let count = value
                    .parse()
                    .map_err(|_| format!("invalid block count: {value}"))?;
                options.blocks = Some(count);
            }
            "--interval" => {
                let value = args.next().ok_or("--interval requires a value")?;
                let millis = value
                    .parse()
                    .map_err(|_| format!("invalid interval: {value}"))?;
                options.interval = Duration::from_millis(millis);
            }
            other => return Err(format!("unknown option: {other}")),
        }
    }
    Ok(options)
}

async fn run(node: &Node, options: &Options) {
    let payer = Account::new();
    let payee = Account::new();
    for account in [&payer, &payee] {
        if let Err(reason) = node
            .submit_transaction(Transaction::create_account(account))
            .await
        {
            error!("account registration rejected: {reason}");
            return;
        }
    }

    let mut mined = 0u64;
    loop {
        if let Err(reason) = node.mine().await {
            error!("mining failed: {reason}");
            return;
        }
        mined += 1;

        let payer_balance = node.balance_of(&payer.address()).await.unwrap_or(0);
        let payee_balance = node.balance_of(&payee.address()).await.unwrap_or(0);
        let operator_balance = node
            .balance_of(&node.operator().address())
            .await
            .unwrap_or(0);
        info!(
            "height {} | operator {} | payer {} | payee {}",
            node.chain_len().await - 1,
            operator_balance,
            payer_balance,
            payee_balance
        );

        if options.blocks.is_some_and(|limit| mined >= limit) {
            info!("mined {mined} block(s), done");
            return;
        }

        let transfer = Transaction::transfer(&payer, &payee.address(), 10, 0);
        if let Err(reason) = node.submit_transaction(transfer).await {
            error!("transfer rejected: {reason}");
            return;
        }

        tokio::time::sleep(options.interval).await;
    }
}

#[tokio::main]
async fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let node = Node::new(Account::new());
    info!("node operating as {}", node.operator().address());

    tokio::select! {
        _ = run(&node, &options) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
        }
    }
}
