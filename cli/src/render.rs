//! HTML rendering of result tables.

use std::fmt::Write;

use valo_core::{RowLinks, VodLinks};
use valo_types::formatting::format_timestamp;
use valo_types::{EnrichedRound, MapRecord, MatchOverview, VersusReport};

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn side(is_attacking: Option<bool>) -> &'static str {
    match is_attacking {
        Some(true) => "Attack",
        Some(false) => "Defense",
        None => "",
    }
}

fn link_cell(link: Option<&str>, label: String) -> String {
    match link {
        Some(href) => format!("<td><a href=\"{}\" target=\"_blank\">{}</a></td>", escape(href), label),
        None => format!("<td>{label}</td>"),
    }
}

fn clock(links: &VodLinks, map: &MapRecord, frame: i64) -> String {
    format_timestamp(links.secs(map, frame))
}

fn header(out: &mut String, titles: &[&str]) {
    out.push_str("<table>\n<thead><tr>");
    for title in titles {
        let _ = write!(out, "<th>{title}</th>");
    }
    out.push_str("</tr></thead>\n<tbody>\n");
}

fn link_cells(out: &mut String, row_links: &RowLinks, labels: [String; 3]) {
    let [start, first, last] = labels;
    out.push_str(&link_cell(row_links.round_start.as_deref(), start));
    out.push_str(&link_cell(row_links.first_true.as_deref(), first));
    out.push_str(&link_cell(row_links.last_true.as_deref(), last));
}

const SEARCH_TITLES: &[&str] = &[
    "Map",
    "Round",
    "Side",
    "Attackers Won",
    "Attacking (1st half)",
    "Defending (1st half)",
    "Date",
    "Round Start",
    "First True",
    "Last True",
];

pub fn search_table(rows: &[EnrichedRound], links: &VodLinks) -> String {
    let mut out = String::new();
    header(&mut out, SEARCH_TITLES);

    for row in rows {
        let map = &row.map;
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
            escape(&map.map_name),
            row.round.round_number,
            side(row.is_attacking),
            row.round.attackers_won,
            escape(&map.first_half_attacking_team),
            escape(&map.first_half_defending_team),
            escape(&map.game_vod_time),
        );
        link_cells(
            &mut out,
            &links.for_round(row),
            [
                clock(links, map, row.round.round_start_frame),
                clock(links, map, row.first_true_frame),
                clock(links, map, row.last_true_frame),
            ],
        );
        out.push_str("</tr>\n");
    }

    out.push_str("</tbody>\n</table>");
    out
}

pub fn versus_table(report: &VersusReport, links: &VodLinks) -> String {
    let mut out = format!(
        "<p>Team 1 won {} / lost {}</p>\n",
        report.side_1_won, report.side_1_lost
    );
    let mut titles = SEARCH_TITLES.to_vec();
    titles.push("Team 1 Won Round");
    header(&mut out, &titles);

    for row in &report.rows {
        let map = &row.map;
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
            escape(&map.map_name),
            row.round.round_number,
            side(Some(row.is_attacking_1)),
            row.round.attackers_won,
            escape(&map.first_half_attacking_team),
            escape(&map.first_half_defending_team),
            escape(&map.game_vod_time),
        );
        link_cells(
            &mut out,
            &links.for_versus(row),
            [
                clock(links, map, row.round.round_start_frame),
                clock(links, map, row.first_true_frame),
                clock(links, map, row.last_true_frame),
            ],
        );
        let _ = writeln!(out, "<td>{}</td></tr>", row.side_1_won_round);
    }

    out.push_str("</tbody>\n</table>");
    out
}

pub fn match_page(overview: &MatchOverview, links: &VodLinks) -> String {
    let map = &overview.map;
    let mut out = format!(
        "<h1>{} vs {}</h1>\n<p>{} &middot; {}</p>\n",
        escape(&map.first_half_attacking_team),
        escape(&map.first_half_defending_team),
        escape(&map.map_name),
        escape(&map.game_vod_time),
    );
    header(&mut out, &["Round", "Winner", "Round Start"]);

    for entry in &overview.rounds {
        let start = entry.round.round_start_frame;
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td>{}</tr>",
            entry.round.round_number,
            escape(&entry.winning_team),
            link_cell(links.embed(map, start).as_deref(), clock(links, map, start)),
        );
    }

    out.push_str("</tbody>\n</table>");
    out
}
