//! Interface de terminal do tmsync: spinner e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner de progresso e `console` para
//! estilização com cores. O [`JobProgress`] acompanha visualmente uma execução
//! de exportação ou importação no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use tmsync::TmsError;
use tmsync::state_machine::{JobReport, PollOutcome};

/// Indicador visual de progresso para uma execução no terminal.
pub struct JobProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para prazo expirado.
    yellow: Style,
}

impl JobProgress {
    /// Inicia o spinner com a descrição da execução.
    pub fn start(description: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(description.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Finaliza o spinner e mostra o resultado do job.
    ///
    /// Concluído em verde; prazo expirado em amarelo, pois o job pode ainda
    /// terminar no TMS.
    pub fn complete(&self, report: &JobReport) {
        self.pb.finish_and_clear();
        match report.outcome {
            PollOutcome::Completed => println!(
                "  {} {} job {} completed ({} entries)",
                self.green.apply_to("✓"),
                report.direction,
                report.job_id,
                report.entries
            ),
            PollOutcome::TimedOut { last_state } => println!(
                "  {} {} job {} still {last_state} after {}s",
                self.yellow.apply_to("⧗"),
                report.direction,
                report.job_id,
                report.waited_secs
            ),
        }
    }

    /// Finaliza o spinner e mostra o erro em vermelho.
    pub fn fail(&self, err: &TmsError) {
        self.pb.finish_and_clear();
        eprintln!("  {} {err}", self.red.apply_to("✗"));
    }
}

/// Imprime o relatório, em JSON ou em texto.
pub fn print_report(report: &JobReport, json: bool) -> serde_json::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    let states: Vec<String> = report.state_history.iter().map(|s| s.to_string()).collect();
    println!("  run       {}", report.run_id);
    println!("  polls     {} [{}]", report.polls, states.join(" → "));
    println!("  waited    {}s", report.waited_secs);
    println!("  duration  {}ms", report.duration_ms);
    Ok(())
}
