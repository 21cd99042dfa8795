//! Front-end commands: thin wrappers that turn controller results into the
//! strings a console (or any other shell) prints.

use crate::{
    api::LocationsApi,
    capture::{CaptureMethod, PixelPoint},
    error::RecorderError,
    map::{MapViewport, SlippyMapView, MAX_MERCATOR_LATITUDE},
    models::{Coordinates, LocationRecord},
    recorder::RecorderController,
};

use chrono::Utc;

fn describe(err: RecorderError) -> String {
    if err.is_transient() {
        format!("{err} (try again in a moment)")
    } else {
        err.to_string()
    }
}

fn format_record(record: &LocationRecord, mine: bool) -> String {
    format!(
        "#{:<6} {:>10.5} {:>11.5}  {}{}",
        record.id,
        record.latitude,
        record.longitude,
        record.timestamp.as_deref().unwrap_or("-"),
        if mine { "  (yours)" } else { "" }
    )
}

pub async fn recording_status(controller: &RecorderController) -> Result<String, String> {
    let eligibility = controller.refresh_eligibility().await;
    let mut lines = vec![if eligibility.is_enabled() {
        "Recording is open.".to_string()
    } else {
        "Recording is closed.".to_string()
    }];
    if let Some(description) = eligibility.description() {
        lines.push(description.to_string());
    }
    if let Some(notice) = eligibility.expiry_notice(Utc::now()) {
        lines.push(notice);
    }
    if let Some(err) = eligibility.fetch_error() {
        lines.push(format!("(status unavailable: {err})"));
    }
    Ok(lines.join("\n"))
}

pub async fn list_records(controller: &RecorderController, mine_only: bool) -> Result<String, String> {
    controller.refresh_records().await.map_err(describe)?;
    let identity = controller.identity().map_err(describe)?;
    let snapshot = controller.snapshot().await;

    let lines: Vec<String> = snapshot
        .records
        .iter()
        .filter(|record| !mine_only || record.is_owned_by(&identity))
        .map(|record| format_record(record, record.is_owned_by(&identity)))
        .collect();

    if lines.is_empty() {
        Ok("No recorded locations.".into())
    } else {
        Ok(lines.join("\n"))
    }
}

/// Records `coordinates` the way a visitor would: the map is centred on the
/// point and clicked there.
pub async fn record_location(
    controller: &RecorderController,
    view: &SlippyMapView,
    coordinates: Coordinates,
) -> Result<String, String> {
    coordinates.validate().map_err(describe)?;
    if coordinates.latitude.abs() > MAX_MERCATOR_LATITUDE {
        return Err(format!(
            "latitude {} is beyond what the map can show",
            coordinates.latitude
        ));
    }

    controller.mount().await;
    controller.dismiss_instructions().await;
    controller
        .select_method(CaptureMethod::Click)
        .await
        .map_err(describe)?;

    view.set_center(coordinates);
    let pixel: PixelPoint = view.pixel_for(coordinates);
    controller.handle_map_click(pixel).await.map_err(describe)?;

    let outcome = controller.confirm().await.map_err(describe)?;
    Ok(format!(
        "Recorded location #{} at ({:.5}, {:.5}).",
        outcome.id, outcome.record.latitude, outcome.record.longitude
    ))
}

pub async fn delete_record(controller: &RecorderController, id: i64) -> Result<String, String> {
    match controller.delete_record(id).await {
        Ok(outcome) if outcome.message.is_empty() => Ok(format!("Deleted location #{id}.")),
        Ok(outcome) => Ok(outcome.message),
        Err(RecorderError::DeleteDeclined) => Ok("Nothing deleted.".into()),
        Err(err) => Err(describe(err)),
    }
}

pub fn whoami(controller: &RecorderController) -> Result<String, String> {
    controller
        .identity()
        .map(|identity| identity.to_string())
        .map_err(describe)
}

pub async fn card_info(api: &dyn LocationsApi) -> Result<String, String> {
    let card = api
        .fetch_card_info()
        .await
        .map_err(|err| err.server_message())?;
    let lines: Vec<String> = card
        .lines()
        .into_iter()
        .map(|(label, value)| format!("{label:<12}{value}"))
        .collect();
    if lines.is_empty() {
        Ok("The card is empty.".into())
    } else {
        Ok(lines.join("\n"))
    }
}
