//! Read-only problem catalog endpoints

use axum::extract::{Path, State};
use axum::Json;

use crate::error::{ApiError, ApiResult};
use crate::models::{Problem, ProblemSummary};
use crate::{db, AppState};

/// GET /api/problems
pub async fn list_problems(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ProblemSummary>>> {
    let problems = db::problems::list_problems(&state.db).await?;
    Ok(Json(problems))
}

/// GET /api/problems/{id}
pub async fn get_problem(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Problem>> {
    let problem = db::problems::get_problem(&state.db, &id)
        .await?
        .ok_or(ApiError::UnknownProblem(id))?;
    Ok(Json(problem))
}
