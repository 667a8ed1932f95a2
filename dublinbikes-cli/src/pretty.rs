use anyhow::Result;
use dublinbikes::Trip;
use std::io::Write;
use termcolor::{Color, ColorSpec, WriteColor};

pub fn pp_trip<W: WriteColor>(out: &mut W, index: usize, trip: &Trip) -> Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
    writeln!(out, "Trip {}:", index + 1)?;
    out.reset()?;
    writeln!(
        out,
        "\tStart: {}, Station: {}",
        trip.start_date_time, trip.start_station
    )?;
    writeln!(
        out,
        "\tEnd: {}, Station: {}",
        trip.end_date_time, trip.end_station
    )?;
    writeln!(out, "\tDuration: {} minutes", trip.duration)?;
    Ok(())
}

/// Prints every trip, numbered from 1, in the order given.
pub fn pp_trips<W: WriteColor>(out: &mut W, trips: &[Trip]) -> Result<()> {
    for (i, trip) in trips.iter().enumerate() {
        pp_trip(out, i, trip)?;
    }
    Ok(())
}

#[test]
fn test_pp_trips() {
    let trip: Trip = serde_json::from_value(serde_json::json!({
        "id": "t1", "movementRef": "MV-1", "subscriptionId": "s", "subscriptionRef": "ANNUAL",
        "contractName": "dublin", "accountId": "acc-1", "status": "CLOSED", "bikeNumber": 7,
        "startDateTime": "2023-05-02T08:01:12Z", "startStation": 32,
        "endDateTime": "2023-05-02T08:19:40Z", "endStation": 5,
        "startStand": 1, "endStand": 2, "duration": 18,
        "rewardsEarned": 0, "rewardsSpent": 0, "price": 0, "discount": 0, "reducedPrice": 0,
        "litigious": false, "isSpecial": false, "isRated": false
    }))
    .unwrap();
    let mut second = trip.clone();
    second.start_station = 5;
    second.end_station = 32;
    second.duration = 21;

    let mut buf = termcolor::Buffer::no_color();
    pp_trips(&mut buf, &[trip, second]).unwrap();
    assert_eq!(
        String::from_utf8(buf.into_inner()).unwrap(),
        "Trip 1:\n\
         \tStart: 2023-05-02T08:01:12Z, Station: 32\n\
         \tEnd: 2023-05-02T08:19:40Z, Station: 5\n\
         \tDuration: 18 minutes\n\
         Trip 2:\n\
         \tStart: 2023-05-02T08:01:12Z, Station: 5\n\
         \tEnd: 2023-05-02T08:19:40Z, Station: 32\n\
         \tDuration: 21 minutes\n"
    );

    let mut buf = termcolor::Buffer::no_color();
    pp_trips(&mut buf, &[]).unwrap();
    assert!(buf.into_inner().is_empty());
}
