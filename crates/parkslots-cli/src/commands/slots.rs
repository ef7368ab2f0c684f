//! Slots commands - query and edit the parking slots list
//!
//! Every subcommand signs in first (silently when an account is cached),
//! then talks to the list through [`ParkingSlotsService`].

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use parkslots_core::{
    domain::{NewParkingSlot, ParkingSlot, ParkingSlotPatch},
    usecases::{GetAllOptions, ParkingSlotsService, DEFAULT_DISPONIBLES_TOP, DEFAULT_FIND_TOP},
};
use serde_json::Value;
use tracing::info;

use crate::app::AppContext;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum SlotsCommand {
    /// List parking slots
    List {
        /// OData filter, e.g. "Title eq 'P-001'"
        #[arg(long)]
        filter: Option<String>,
        /// OData ordering, e.g. "Title desc"
        #[arg(long)]
        orderby: Option<String>,
        /// Maximum number of items
        #[arg(long)]
        top: Option<u32>,
    },
    /// Show one parking slot
    Get {
        /// List item ID
        id: String,
    },
    /// Create a parking slot
    Create {
        #[command(flatten)]
        fields: SlotFields,
    },
    /// Change fields of a parking slot
    Update {
        /// List item ID
        id: String,
        #[command(flatten)]
        fields: SlotFields,
    },
    /// Delete a parking slot
    Delete {
        /// List item ID
        id: String,
    },
    /// Find parking slots by code
    Find {
        /// Exact value of the Codigo column
        codigo: String,
        #[arg(long, default_value_t = DEFAULT_FIND_TOP)]
        top: u32,
    },
    /// List available parking slots ordered by code
    Available {
        #[arg(long, default_value_t = DEFAULT_DISPONIBLES_TOP)]
        top: u32,
    },
}

/// Column values accepted by `create` and `update`
#[derive(Debug, Clone, Default, Args)]
pub struct SlotFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    tipo_celda: Option<String>,
    /// JSON value; anything that is not valid JSON is sent as a string
    #[arg(long)]
    itinerancia: Option<String>,
    #[arg(long)]
    activa: Option<bool>,
}

impl SlotFields {
    fn into_patch(self) -> ParkingSlotPatch {
        ParkingSlotPatch {
            title: self.title,
            tipo_celda: self.tipo_celda,
            itinerancia: self.itinerancia.as_deref().map(parse_itinerancia),
            activa: self.activa,
        }
    }

    fn into_new(self) -> Result<NewParkingSlot> {
        let patch = self.into_patch();
        let title = patch.title.context("--title is required to create a slot")?;

        let mut record = NewParkingSlot::new(title);
        if let Some(tipo_celda) = patch.tipo_celda {
            record = record.with_tipo_celda(tipo_celda);
        }
        if let Some(itinerancia) = patch.itinerancia {
            record = record.with_itinerancia(itinerancia);
        }
        if let Some(activa) = patch.activa {
            record = record.with_activa(activa);
        }
        Ok(record)
    }
}

fn parse_itinerancia(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

impl SlotsCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        let service = connect(ctx).await?;

        match self {
            SlotsCommand::List {
                filter,
                orderby,
                top,
            } => {
                let mut opts = GetAllOptions::new();
                if let Some(filter) = filter {
                    opts = opts.filter(filter.clone());
                }
                if let Some(orderby) = orderby {
                    opts = opts.orderby(orderby.clone());
                }
                if let Some(top) = top {
                    opts = opts.top(*top);
                }
                let slots = service.get_all(&opts).await?;
                print_slots(&*fmt, &slots)
            }
            SlotsCommand::Get { id } => {
                let slot = service.get(id).await?;
                print_slot(&*fmt, &slot)
            }
            SlotsCommand::Create { fields } => {
                let record = fields.clone().into_new()?;
                let slot = service.create(&record).await?;
                info!(id = %slot.id, "Created parking slot");
                fmt.success(&format!("Created slot {}", slot.id));
                print_slot(&*fmt, &slot)
            }
            SlotsCommand::Update { id, fields } => {
                let patch = fields.clone().into_patch();
                if patch.is_empty() {
                    anyhow::bail!("Nothing to update; pass at least one field option");
                }
                let slot = service.update(id, &patch).await?;
                fmt.success(&format!("Updated slot {}", slot.id));
                print_slot(&*fmt, &slot)
            }
            SlotsCommand::Delete { id } => {
                service.delete(id).await?;
                fmt.success(&format!("Deleted slot {}", id));
                Ok(())
            }
            SlotsCommand::Find { codigo, top } => {
                let slots = service.find_by_codigo(codigo, *top).await?;
                print_slots(&*fmt, &slots)
            }
            SlotsCommand::Available { top } => {
                let slots = service.get_disponibles(*top).await?;
                print_slots(&*fmt, &slots)
            }
        }
    }
}

/// Signs in and returns a list client using the session's tokens
async fn connect(ctx: &AppContext) -> Result<ParkingSlotsService> {
    let store = ctx.open_store()?;
    let identity = ctx.identity(store.clone());

    identity
        .ensure_login()
        .await
        .context("Sign-in required. Run 'parkslots auth login'")?;

    ctx.slots_service(store, identity)
}

fn print_slot(fmt: &dyn OutputFormatter, slot: &ParkingSlot) -> Result<()> {
    fmt.print_json(&serde_json::to_value(slot)?);
    fmt.table(&HEADERS, &[row(slot)]);
    Ok(())
}

fn print_slots(fmt: &dyn OutputFormatter, slots: &[ParkingSlot]) -> Result<()> {
    fmt.print_json(&serde_json::to_value(slots)?);
    if slots.is_empty() {
        fmt.info("No parking slots found");
    } else {
        fmt.table(&HEADERS, &slots.iter().map(row).collect::<Vec<_>>());
    }
    Ok(())
}

const HEADERS: [&str; 5] = ["ID", "Title", "TipoCelda", "Itinerancia", "Activa"];

fn row(slot: &ParkingSlot) -> Vec<String> {
    vec![
        slot.id.clone(),
        slot.title.clone().unwrap_or_default(),
        slot.tipo_celda.clone().unwrap_or_default(),
        match &slot.itinerancia {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        },
        match slot.activa {
            Some(true) => "yes".to_string(),
            Some(false) => "no".to_string(),
            None => String::new(),
        },
    ]
}
