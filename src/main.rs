use clap::{Parser, Subcommand};
use grandham_catalog::catalog::draft::BookDraft;
use grandham_catalog::catalog::service::BookService;
use grandham_catalog::catalog::{AssociateKind, Book, BookPatch};
use grandham_catalog::configs;
use grandham_catalog::store::diesel::PgStore;
use grandham_catalog::user::{NewUser, UserService};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "grandham", about = "Grandham 도서 카탈로그 관리 도구")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// JSON 파일의 도서 초안으로 도서를 등록한다.
    Create {
        #[arg(long)]
        file: PathBuf,

        /// 등록 이력을 남길 사용자 아이디
        #[arg(long)]
        user: Option<u64>,
    },

    /// 도서 상세 정보를 출력한다.
    Show {
        grandham_id: String,

        /// 승인, 출판 여부와 관계 없이 조회
        #[arg(long)]
        all: bool,
    },

    /// JSON 파일의 변경 내용으로 도서를 수정한다.
    Edit {
        grandham_id: String,

        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        user: u64,
    },

    Approve { grandham_id: String },

    Publish { grandham_id: String },

    Unpublish { grandham_id: String },

    Search { query: String },

    /// JSON 파일의 가입 요청으로 사용자를 가입 시킨다.
    Register {
        #[arg(long)]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    configs::load_dotenv();
    let config = match configs::load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let logging = match config.logger() {
        Some(logger) => configs::logging::set_global_logging_config(logger).map(Some),
        None => configs::logging::set_stdout_logging().map(|_| None),
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &configs::AppConfig) -> Result<(), Box<dyn Error>> {
    let pool = configs::connect_to_postgres(config.database())?;
    let store = PgStore::new(pool);
    let books = BookService::new(store.repositories());

    match command {
        Command::Create { file, user } => {
            let draft = BookDraft::from_json(&std::fs::read_to_string(file)?)?;
            let book = books.create_book(&draft, user)?;
            info!("도서 등록 완료 (grandham_id: {})", book.grandham_id());
            println!("{}", book.to_param());
        }
        Command::Show { grandham_id, all } => {
            let book = if all {
                books.find_unfiltered(&grandham_id)?
            } else {
                books.find(&grandham_id)?
            };
            print_book(&books, &book)?;
        }
        Command::Edit { grandham_id, file, user } => {
            let patch: BookPatch = serde_json::from_str(&std::fs::read_to_string(file)?)?;
            let book = books.edit(&grandham_id, &patch, user)?;
            print_book(&books, &book)?;
        }
        Command::Approve { grandham_id } => {
            books.approve(&grandham_id)?;
        }
        Command::Publish { grandham_id } => {
            books.publish(&grandham_id)?;
        }
        Command::Unpublish { grandham_id } => {
            books.unpublish(&grandham_id)?;
        }
        Command::Search { query } => {
            for book in books.search(&query)? {
                println!("{}\t{}", book.to_param(), book.name());
            }
        }
        Command::Register { file } => {
            let new_user = NewUser::from_json(&std::fs::read_to_string(file)?)?;
            let user = UserService::new(Rc::new(Box::new(store.clone()))).register(&new_user)?;
            println!("{}\t{}", user.id(), user.login());
        }
    }
    Ok(())
}

fn print_book(books: &BookService, book: &Book) -> Result<(), Box<dyn Error>> {
    let mut output = serde_json::Map::new();
    output.insert("grandham_id".to_owned(), book.to_param().into());
    output.extend(book.details()?);

    for kind in AssociateKind::ALL {
        let names: Vec<serde_json::Value> = books.associates(book, kind)?
            .iter()
            .map(|a| a.name().into())
            .collect();
        output.insert(format!("{}", kind).to_lowercase(), names.into());
    }
    let covers: Vec<serde_json::Value> = books.covers(book)?
        .iter()
        .map(|c| c.image().into())
        .collect();
    output.insert("covers".to_owned(), covers.into());

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
