use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ongaku_paths::{PATHS, store_file_in};
use ongaku_persistence::{
    AuthMethod, GaiaHubProvider, PersistenceConfig, SignInOutcome, SignInProcess, StrategySelector,
};

const USAGE: &str = "\
uso: ongaku-store <comando>

  status               método activo, sesión y tamaño del dataset
  export [fichero]     vuelca el dataset activo como JSON (stdout si no hay fichero)
  select <METODO>      LOCAL | BLOCKSTACK
  deselect             vuelve a no tener método
  sign-in              inicia sesión con el método activo
  callback <token>     resuelve el authResponse recibido tras la redirección
  sign-out             cierra la sesión del método activo";

fn load_config() -> Result<PersistenceConfig> {
    let path = &PATHS.settings_file;
    if path.exists() {
        return PersistenceConfig::from_file(path)
            .with_context(|| format!("leyendo {}", path.display()));
    }

    let config = PersistenceConfig::default();
    config.to_file(path)?;
    info!("Configuración por defecto escrita en {}", path.display());
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{USAGE}");
        return Ok(());
    };

    let config = load_config()?;
    let provider = Arc::new(GaiaHubProvider::new(&config.remote)?);
    let selector = StrategySelector::new(&config, provider.clone())?;

    match command.as_str() {
        "status" => {
            let active = selector.resolve_active();
            println!(
                "método:    {}",
                selector.active_method().map_or("(ninguno)", AuthMethod::as_str)
            );
            println!("sesión:    {}", active.is_signed_in());
            println!("usuario:   {}", active.user_data());
            println!("store:     {}", store_file_in(&config.local.store_dir, &config.local.store_name)?.display());

            let data = active.get_data().await?;
            println!(
                "dataset:   {} favoritos, {} sources, {} pistas ({} huérfanas)",
                data.favourites.len(),
                data.sources.len(),
                data.tracks.len(),
                data.orphan_tracks().count()
            );
        }
        "export" => {
            let data = selector.resolve_active().get_data().await?;
            let json = serde_json::to_string_pretty(&data)?;
            match args.get(1).map(PathBuf::from) {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    info!("Dataset exportado a {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        "select" => {
            let Some(name) = args.get(1) else {
                bail!("falta el método\n\n{USAGE}");
            };
            let method: AuthMethod = name.parse()?;
            let _ = selector.select(method)?;
        }
        "deselect" => selector.deselect()?,
        "sign-in" => match selector.resolve_active().sign_in()? {
            SignInOutcome::Unchanged => warn!("No hay método seleccionado"),
            SignInOutcome::Restart => println!("Sesión iniciada. Reinicia la aplicación."),
            SignInOutcome::Redirect { url } => println!("Abre {url} para iniciar sesión"),
        },
        "callback" => {
            let Some(token) = args.get(1) else {
                bail!("falta el token\n\n{USAGE}");
            };
            provider.set_pending_auth_response(token.as_str());
            match selector.strategy(AuthMethod::Blockstack).handle_sign_in_process().await? {
                SignInProcess::NotApplicable => warn!("No había ningún sign-in pendiente"),
                SignInProcess::Reload { location } => println!("Sesión iniciada; recarga {location}"),
            }
        }
        "sign-out" => selector.resolve_active().sign_out()?,
        other => bail!("comando desconocido: {other}\n\n{USAGE}"),
    }

    Ok(())
}
