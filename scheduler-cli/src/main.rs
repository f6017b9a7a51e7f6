use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use scheduler_client::{
    Credentials, FilePart, FileTokenStorage, Platform, Post, PostForm, PostUpdate, ProfileForm,
    RegisterForm, RouteName, SCHEDULED_TIME_FORMAT, SchedulerClient, StoreStatus, ToggleAction,
    User, normalize_base_url, resolve_path,
};

mod logging;
mod settings;

use logging::init_logging;
use settings::Settings;

#[derive(Debug, Parser)]
#[command(
    name = "scheduler-cli",
    version,
    about = "CLI клиент для планировщика публикаций"
)]
struct Cli {
    /// Адрес API (по умолчанию SCHEDULER_API_URL или http://127.0.0.1:8000).
    #[arg(long, global = true)]
    server: Option<String>,

    /// Отладочные логи клиента в stderr.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Регистрация пользователя.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Подтверждение пароля; по умолчанию совпадает с паролем.
        #[arg(long)]
        password_confirmation: Option<String>,
    },
    /// Вход пользователя.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Выход; локальный токен удаляется в любом случае.
    Logout,
    /// Профиль (требует токен).
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    /// Посты.
    Posts {
        #[command(subcommand)]
        command: PostsCommand,
    },
    /// Платформы публикации (требует токен).
    Platforms {
        #[command(subcommand)]
        command: PlatformsCommand,
    },
    /// Аналитика по постам (требует токен).
    Analytics,
    /// Журнал публикаций (требует токен).
    Logs,
    /// Показывает, куда приведёт переход по пути с учётом авторизации.
    Open { path: String },
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    /// Текущий пользователь.
    Show,
    /// Изменение профиля.
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum PostsCommand {
    /// Список постов (требует токен).
    List {
        /// Фильтр `ключ=значение`, можно несколько.
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
    /// Пост по id.
    Get {
        #[arg(long)]
        id: i64,
    },
    /// Создание поста (требует токен).
    Create {
        #[command(flatten)]
        form: PostArgs,
    },
    /// Обновление поста (требует токен); меняются только переданные поля.
    Update {
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        update: UpdateArgs,
    },
    /// Удаление поста (требует токен).
    Delete {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Debug, clap::Args)]
struct PostArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    content: String,
    /// Время публикации в формате `ГГГГ-ММ-ДД ЧЧ:ММ:СС`.
    #[arg(long, value_parser = parse_scheduled_time)]
    scheduled_time: Option<NaiveDateTime>,
    /// Статус поста (`draft`, `scheduled`, ...).
    #[arg(long)]
    status: Option<String>,
    /// Идентификатор платформы, можно несколько.
    #[arg(long = "platform")]
    platforms: Vec<i64>,
    /// Путь к изображению; с ним запрос уходит как multipart.
    #[arg(long)]
    image: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
struct UpdateArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    content: Option<String>,
    /// Время публикации в формате `ГГГГ-ММ-ДД ЧЧ:ММ:СС`.
    #[arg(long, value_parser = parse_scheduled_time)]
    scheduled_time: Option<NaiveDateTime>,
    #[arg(long)]
    status: Option<String>,
    /// Идентификатор платформы, можно несколько; заменяет набор платформ.
    #[arg(long = "platform")]
    platforms: Vec<i64>,
    /// Снять все платформы.
    #[arg(long, conflicts_with = "platforms")]
    clear_platforms: bool,
    #[arg(long)]
    image: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum PlatformsCommand {
    /// Все платформы.
    List,
    /// Платформы, включённые у пользователя.
    Active,
    /// Включение/выключение платформы.
    Toggle {
        #[arg(long)]
        id: i64,
        #[arg(long, value_enum)]
        action: ToggleArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ToggleArg {
    Activate,
    Deactivate,
}

impl From<ToggleArg> for ToggleAction {
    fn from(value: ToggleArg) -> Self {
        match value {
            ToggleArg::Activate => ToggleAction::Activate,
            ToggleArg::Deactivate => ToggleAction::Deactivate,
        }
    }
}

impl Command {
    /// Экран, которому соответствует команда; через него проходит гард.
    fn view_path(&self) -> Option<String> {
        let path = match self {
            Command::Register { .. } => RouteName::Register.path().to_string(),
            Command::Login { .. } => RouteName::Login.path().to_string(),
            Command::Logout => return None,
            Command::Profile { .. } => RouteName::Profile.path().to_string(),
            Command::Posts { command } => match command {
                PostsCommand::List { .. } => RouteName::Dashboard.path().to_string(),
                PostsCommand::Get { id } => format!("/posts/{id}"),
                PostsCommand::Create { .. } => RouteName::PostCreate.path().to_string(),
                PostsCommand::Update { id, .. } => format!("/posts/update/{id}"),
                PostsCommand::Delete { id } => format!("/posts/delete/{id}"),
            },
            Command::Platforms { .. } => RouteName::Settings.path().to_string(),
            Command::Analytics => RouteName::PostAnalytics.path().to_string(),
            Command::Logs => RouteName::Logs.path().to_string(),
            Command::Open { .. } => return None,
        };
        Some(path)
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Ошибка: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = Settings::from_env()?;
    if let Some(server) = cli.server {
        settings.api_url = normalize_base_url(&server);
    }
    init_logging(&settings.log_level, cli.verbose)?;
    tracing::debug!(
        api_url = %settings.api_url,
        token_file = %settings.token_file.display(),
        "settings loaded"
    );

    let mut client = SchedulerClient::connect(
        settings.client_config(),
        FileTokenStorage::new(&settings.token_file),
    )
    .with_context(|| format!("не удалось прочитать {}", settings.token_file.display()))?;

    if let Some(path) = cli.command.view_path() {
        guard(&mut client, &path).await?;
    }

    match cli.command {
        Command::Register {
            name,
            email,
            password,
            password_confirmation,
        } => {
            let form = RegisterForm {
                name,
                email,
                password_confirmation: password_confirmation.unwrap_or_else(|| password.clone()),
                password,
            };
            client.auth.register(&form).await;
            ensure_ok(client.auth.status())?;
            print_message(client.auth.status());
            if let Some(user) = client.auth.user() {
                print_user(&user);
            }
        }
        Command::Login { email, password } => {
            client.auth.login(&Credentials { email, password }).await;
            ensure_ok(client.auth.status())?;
            print_message(client.auth.status());
            if let Some(user) = client.auth.user() {
                print_user(&user);
            }
        }
        Command::Logout => {
            client.auth.logout().await;
            println!("Выход выполнен");
        }
        Command::Profile { command } => match command {
            ProfileCommand::Show => {
                let user = client
                    .auth
                    .user()
                    .ok_or_else(|| anyhow!("профиль недоступен"))?;
                print_user(&user);
            }
            ProfileCommand::Update {
                name,
                email,
                password,
            } => {
                let form = ProfileForm {
                    name,
                    email,
                    password_confirmation: password.clone(),
                    password,
                };
                let user = client.auth.update_profile(&form).await;
                ensure_ok(client.auth.status())?;
                print_message(client.auth.status());
                if let Some(user) = user {
                    print_user(&user);
                }
            }
        },
        Command::Posts { command } => run_posts(&mut client, command).await?,
        Command::Platforms { command } => match command {
            PlatformsCommand::List => {
                let platforms = client.platforms.fetch_all().await.to_vec();
                ensure_ok(client.platforms.status())?;
                print_platforms("Платформы", &platforms);
            }
            PlatformsCommand::Active => {
                let platforms = client.platforms.fetch_active().await.to_vec();
                ensure_ok(client.platforms.status())?;
                print_platforms("Активные платформы", &platforms);
            }
            PlatformsCommand::Toggle { id, action } => {
                client.platforms.toggle(id, action.into()).await;
                ensure_ok(client.platforms.status())?;
                print_message(client.platforms.status());
                print_platforms("Активные платформы", client.platforms.active_platforms());
            }
        },
        Command::Analytics => {
            let report = client.analytics.fetch_post_analytics().await.cloned();
            ensure_ok(client.analytics.status())?;
            if let Some(report) = report {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Command::Logs => {
            let logs = client.logs.fetch_logs().await.to_vec();
            ensure_ok(client.logs.status())?;
            println!("Записей: {}", logs.len());
            for entry in &logs {
                println!("- {entry}");
            }
        }
        Command::Open { path } => {
            let landed = client.navigate(&path).await?;
            println!("Маршрут: {} ({})", landed.name.name(), landed.name.path());
            for (key, value) in &landed.params {
                println!("  {key}: {value}");
            }
        }
    }

    Ok(())
}

async fn run_posts(client: &mut SchedulerClient, command: PostsCommand) -> Result<()> {
    match command {
        PostsCommand::List { filters } => {
            let posts = client.posts.list_posts(&filters).await;
            ensure_ok(client.posts.status())?;
            print_posts(&posts);
        }
        PostsCommand::Get { id } => {
            let post = client.posts.get_post(id).await;
            ensure_ok(client.posts.status())?;
            let post = post.ok_or_else(|| anyhow!("пост не найден: id={id}"))?;
            print_post("Пост", &post);
        }
        PostsCommand::Create { form } => {
            let form = post_form(form).await?;
            let post = client.posts.create_post(form).await;
            ensure_ok(client.posts.status())?;
            print_message(client.posts.status());
            if let Some(post) = post {
                print_post("Пост создан", &post);
            }
        }
        PostsCommand::Update { id, update } => {
            let update = post_update(update).await?;
            let post = client.posts.update_post(id, update).await;
            ensure_ok(client.posts.status())?;
            print_message(client.posts.status());
            if let Some(post) = post {
                print_post("Пост обновлён", &post);
            }
        }
        PostsCommand::Delete { id } => {
            client.posts.delete_post(id).await;
            ensure_ok(client.posts.status())?;
            print_message(client.posts.status());
        }
    }
    Ok(())
}

/// Прогоняет гард для экрана команды; перенаправление означает отказ.
async fn guard(client: &mut SchedulerClient, path: &str) -> Result<()> {
    let expected = resolve_path(path).ok_or_else(|| anyhow!("неизвестный маршрут: {path}"))?;
    let landed = client.navigate(path).await?;
    if landed.name == expected.name {
        return Ok(());
    }

    let message = match landed.name {
        RouteName::Login => {
            "требуется авторизация: выполните `scheduler-cli login ...` или `scheduler-cli register ...`"
                .to_string()
        }
        RouteName::Home => "вы уже вошли: сначала выполните `scheduler-cli logout`".to_string(),
        other => format!("переход перенаправлен на {}", other.path()),
    };
    Err(anyhow!(message))
}

async fn read_image(path: Option<PathBuf>) -> Result<Option<FilePart>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let image = FilePart::from_path(&path)
        .await
        .with_context(|| format!("не удалось прочитать {}", path.display()))?;
    Ok(Some(image))
}

async fn post_form(args: PostArgs) -> Result<PostForm> {
    let image = read_image(args.image).await?;

    Ok(PostForm {
        title: args.title,
        content: args.content,
        scheduled_time: args.scheduled_time,
        status: args.status,
        platforms: args.platforms,
        image,
    })
}

async fn post_update(args: UpdateArgs) -> Result<PostUpdate> {
    let platforms = if args.clear_platforms {
        Some(Vec::new())
    } else {
        Some(args.platforms).filter(|ids| !ids.is_empty())
    };

    Ok(PostUpdate {
        title: args.title,
        content: args.content,
        scheduled_time: args.scheduled_time,
        status: args.status,
        platforms,
        image: read_image(args.image).await?,
    })
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("ожидается ключ=значение, получено `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("пустой ключ фильтра в `{raw}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn parse_scheduled_time(raw: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw.trim(), SCHEDULED_TIME_FORMAT)
        .map_err(|err| format!("ожидается `ГГГГ-ММ-ДД ЧЧ:ММ:СС`: {err}"))
}

/// Ошибки хранилища превращаются в ошибку команды.
fn ensure_ok(status: &StoreStatus) -> Result<()> {
    if !status.has_errors() {
        return Ok(());
    }
    Err(anyhow!(format_errors(status)))
}

fn format_errors(status: &StoreStatus) -> String {
    status
        .errors()
        .iter()
        .map(|(field, messages)| format!("{field}: {}", messages.join("; ")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_message(status: &StoreStatus) {
    if let Some(message) = status.message() {
        println!("{message}");
    }
}

fn print_user(user: &User) {
    println!("user:");
    println!("  id: {}", user.id);
    println!("  name: {}", user.name.as_deref().unwrap_or("-"));
    println!("  email: {}", user.email.as_deref().unwrap_or("-"));
    for (key, value) in &user.profile {
        println!("  {key}: {value}");
    }
}

fn print_post(title: &str, post: &Post) {
    println!("{title}");
    println!("id: {}", post.id);
    println!("title: {}", post.title);
    println!("content: {}", post.content.as_deref().unwrap_or(""));
    println!("status: {}", post.status);
    println!(
        "scheduled_time: {}",
        post.scheduled_time.as_deref().unwrap_or("-")
    );
    println!("image_url: {}", post.image_url.as_deref().unwrap_or("-"));
    println!("platforms: {:?}", post.platform_ids());
}

fn print_posts(posts: &[Post]) {
    println!("Постов: {}", posts.len());
    for post in posts {
        println!(
            "- [{}] {} ({}, {})",
            post.id,
            post.title,
            post.status,
            post.scheduled_time.as_deref().unwrap_or("без даты")
        );
    }
}

fn print_platforms(title: &str, platforms: &[Platform]) {
    println!("{title}: {}", platforms.len());
    for platform in platforms {
        println!("- [{}] {}", platform.id, platform.name);
    }
}
