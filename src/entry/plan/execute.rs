use std::sync::Arc;

use tracing::info;

use crate::control::{bind_control_listener, serve_control};
use crate::error::AppResult;
use crate::http::{HttpExecutor, QueryGenerator, build_client};
use crate::run::{RunController, render_report, setup_progress_reporter};
use crate::shutdown_handlers::{
    setup_signal_shutdown_handler, setup_stop_on_shutdown, shutdown_channel,
};

use super::types::{OneShotPlan, RequestPlan, RunPlan, ServePlan};

pub(crate) async fn execute_plan(plan: RunPlan) -> AppResult<()> {
    match plan {
        RunPlan::Run(plan) => run_once(plan).await,
        RunPlan::Serve(plan) => serve(plan).await,
    }
}

fn build_controller(request: &RequestPlan) -> AppResult<RunController> {
    let queries = Arc::new(QueryGenerator::new(&request.query_pattern)?);
    let client = build_client(request.timeout)?;
    let executor = Arc::new(HttpExecutor::new(client, request.timeout));
    Ok(RunController::new(executor, queries))
}

async fn run_once(plan: OneShotPlan) -> AppResult<()> {
    let controller = build_controller(&plan.request)?;

    let (shutdown_tx, _) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);
    let stop_handle = setup_stop_on_shutdown(controller.clone(), &shutdown_tx);
    let progress_handle = (!plan.no_progress)
        .then(|| setup_progress_reporter(controller.clone(), shutdown_tx.subscribe()));

    let report = controller.run_to_completion(plan.config).await;

    drop(shutdown_tx.send(()));
    signal_handle.await?;
    stop_handle.await?;
    if let Some(handle) = progress_handle {
        handle.await?;
    }

    let report = report?;
    if report.interrupted {
        println!("interrupted");
    }
    println!("{}", render_report(&report, plan.output_format)?);
    Ok(())
}

async fn serve(plan: ServePlan) -> AppResult<()> {
    let controller = build_controller(&plan.request)?;
    let listener = bind_control_listener(plan.listen).await?;

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    serve_control(listener, controller, plan.auth_token, shutdown_rx).await;

    drop(shutdown_tx.send(()));
    signal_handle.await?;
    info!("Control API shut down");
    Ok(())
}
