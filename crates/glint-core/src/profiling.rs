//! Profiling utilities based on the `puffin` crate.

pub use puffin::{GlobalProfiler, profile_function, profile_scope};

/// Profiling backend options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilingBackend {
    /// Record scopes in-process only.
    InProcess,
    /// Send profiling data to puffin_viewer via HTTP.
    #[cfg(feature = "profiling-server")]
    PuffinHttp,
}

#[cfg(feature = "profiling-server")]
static PROFILING_SERVER: std::sync::OnceLock<puffin_http::Server> = std::sync::OnceLock::new();

/// Enable scope recording for the given backend.
///
/// ```no_run
/// use glint_core::profiling::{init_profiling, ProfilingBackend};
///
/// init_profiling(ProfilingBackend::PuffinHttp);
/// ```
pub fn init_profiling(backend: ProfilingBackend) {
    puffin::set_scopes_on(true);

    match backend {
        ProfilingBackend::InProcess => {
            tracing::info!("Puffin scopes enabled (in-process)");
        }
        #[cfg(feature = "profiling-server")]
        ProfilingBackend::PuffinHttp => {
            let addr = "0.0.0.0:8585";
            match puffin_http::Server::new(addr) {
                Ok(server) => {
                    tracing::info!("Puffin profiler server started on http://{}", addr);
                    let _ = PROFILING_SERVER.set(server);
                }
                Err(e) => {
                    tracing::error!("Failed to start puffin server: {}", e);
                }
            }
        }
    }
}

/// Mark a frame boundary in the profiler.
#[inline]
pub fn new_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}
