//! Plan mode: collecting proposed tool calls into an approvable plan
//! instead of executing them.
//!
//! At most one active plan exists per chat. Lifecycle: created on
//! plan-mode activation, destroyed on approval, cancellation, or
//! deactivation.

pub mod tools;

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use herald_domain::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Collecting,
    Ready,
    Approved,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub tool_name: String,
    pub description: String,
    pub order: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub status: PlanStatus,
    pub steps: Vec<PlanStep>,
    pub chat_id: String,
}

impl Plan {
    fn new(chat_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: PlanStatus::Collecting,
            steps: Vec::new(),
            chat_id: chat_id.to_owned(),
        }
    }

    /// Approval summary appended to the turn's response.
    pub fn render_summary(&self) -> String {
        let mut out = String::from("Waiting for approval");
        for step in &self.steps {
            out.push_str(&format!(
                "\n{}. {} — {}",
                step.order, step.tool_name, step.description
            ));
        }
        out
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PlanService
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process-wide plan registry, one active plan per chat. All step
/// additions to a plan serialize on the registry lock.
pub struct PlanService {
    enabled: bool,
    /// chat_id → active plan.
    plans: Mutex<HashMap<String, Plan>>,
}

impl PlanService {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            plans: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_feature_enabled(&self) -> bool {
        self.enabled
    }

    /// Enter plan mode for a chat, creating the collecting plan.
    /// Returns the existing plan id when the chat is already in plan
    /// mode.
    pub fn activate_plan_mode(&self, chat_id: &str) -> String {
        let mut plans = self.plans.lock();
        plans
            .entry(chat_id.to_owned())
            .or_insert_with(|| {
                tracing::debug!(chat_id, "plan mode activated");
                Plan::new(chat_id)
            })
            .id
            .clone()
    }

    pub fn is_plan_mode_active(&self, chat_id: &str) -> bool {
        self.plans.lock().contains_key(chat_id)
    }

    pub fn active_plan(&self, chat_id: &str) -> Option<Plan> {
        self.plans.lock().get(chat_id).cloned()
    }

    /// Append a step. Allowed only while the plan is COLLECTING.
    pub fn add_step(
        &self,
        plan_id: &str,
        tool_name: &str,
        arguments: Option<Value>,
        description: &str,
    ) -> Result<PlanStep> {
        let mut plans = self.plans.lock();
        let plan = Self::by_id(&mut plans, plan_id)?;
        if plan.status != PlanStatus::Collecting {
            return Err(Error::Plan(format!(
                "cannot add step to plan {plan_id} in state {:?}",
                plan.status
            )));
        }
        let step = PlanStep {
            id: uuid::Uuid::new_v4().to_string(),
            tool_name: tool_name.to_owned(),
            description: description.to_owned(),
            order: plan.steps.len() + 1,
            arguments,
        };
        plan.steps.push(step.clone());
        Ok(step)
    }

    /// COLLECTING → READY. Requires at least one step.
    pub fn finalize_plan(&self, plan_id: &str) -> Result<Plan> {
        let mut plans = self.plans.lock();
        let plan = Self::by_id(&mut plans, plan_id)?;
        if plan.status != PlanStatus::Collecting {
            return Err(Error::Plan(format!(
                "cannot finalize plan {plan_id} in state {:?}",
                plan.status
            )));
        }
        if plan.steps.is_empty() {
            return Err(Error::Plan(format!("plan {plan_id} has no steps")));
        }
        plan.status = PlanStatus::Ready;
        Ok(plan.clone())
    }

    /// Any active state → CANCELLED; the plan leaves the registry.
    pub fn cancel_plan(&self, plan_id: &str) -> Result<Plan> {
        let mut plans = self.plans.lock();
        let chat_id = Self::by_id(&mut plans, plan_id)?.chat_id.clone();
        let mut plan = plans.remove(&chat_id).expect("looked up above");
        plan.status = PlanStatus::Cancelled;
        tracing::debug!(plan_id, chat_id = %plan.chat_id, "plan cancelled");
        Ok(plan)
    }

    /// READY → APPROVED; the plan leaves the registry.
    pub fn approve_plan(&self, plan_id: &str) -> Result<Plan> {
        let mut plans = self.plans.lock();
        let plan = Self::by_id(&mut plans, plan_id)?;
        if plan.status != PlanStatus::Ready {
            return Err(Error::Plan(format!(
                "cannot approve plan {plan_id} in state {:?}",
                plan.status
            )));
        }
        let chat_id = plan.chat_id.clone();
        let mut plan = plans.remove(&chat_id).expect("looked up above");
        plan.status = PlanStatus::Approved;
        Ok(plan)
    }

    /// End the plan-mode branch for a chat without a state change.
    pub fn deactivate_plan_mode(&self, chat_id: &str) {
        if self.plans.lock().remove(chat_id).is_some() {
            tracing::debug!(chat_id, "plan mode deactivated");
        }
    }

    fn by_id<'a>(
        plans: &'a mut HashMap<String, Plan>,
        plan_id: &str,
    ) -> Result<&'a mut Plan> {
        plans
            .values_mut()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| Error::Plan(format!("no active plan with id {plan_id}")))
    }
}
