use crate::AnalysisRequest;

pub fn build_prompt(request: &AnalysisRequest) -> String {
    let combined = request.texts.join("\n\n");
    format!(
        "\nBelow are {count} tweets mentioning the cryptocurrency ${ticker} \n\
and exchanges including {exchanges}. \n\
\n\
As a cryptocurrency analyst, please provide the following information:\n\
1. Is this likely a new listing or just discussion of an existing token?\n\
2. Sentiment score (-5 to +5) based on these tweets\n\
3. Key points mentioned about the token (use bullets)\n\
4. Potential red flags or warning signs, if any\n\
5. Exchange listing status (rumored, confirmed, etc.)\n\
6. Overall recommendation (Investigate Further, Ignore, High Interest)\n\
\n\
Tweets:\n\
{combined}\n\
\n\
Format your analysis as a JSON with the following fields:\n\
- likely_new_listing: boolean\n\
- sentiment_score: number\n\
- key_points: list of strings\n\
- red_flags: list of strings\n\
- listing_status: string\n\
- recommendation: string\n\
- brief_summary: string (100 words max)\n",
        count = request.texts.len(),
        ticker = request.ticker,
        exchanges = request.exchanges.join(", "),
        combined = combined,
    )
}
